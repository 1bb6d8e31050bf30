use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::invoice_repository::{check_version, InvoiceRepository};
use crate::core::{AppError, Result};
use crate::modules::invoices::models::{Invoice, InvoiceType, LedgerEntry, LedgerOutcome};

/// A thread-safe in-memory invoice store.
///
/// The write lock serializes ledger mutations the way the row lock does in MySQL.
#[derive(Default, Clone)]
pub struct InMemoryInvoiceRepository {
    invoices: Arc<RwLock<HashMap<String, Invoice>>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn create(&self, invoice: &Invoice) -> Result<()> {
        let mut invoices = self.invoices.write().await;
        if invoices
            .values()
            .any(|existing| existing.order_id == invoice.order_id)
        {
            return Err(AppError::conflict(format!(
                "Invoice already exists for order {}",
                invoice.order_id
            )));
        }
        invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        let invoices = self.invoices.read().await;
        Ok(invoices.get(id).cloned())
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Invoice>> {
        let invoices = self.invoices.read().await;
        Ok(invoices
            .values()
            .find(|invoice| invoice.order_id == order_id)
            .cloned())
    }

    async fn list(
        &self,
        invoice_type: Option<InvoiceType>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Invoice>> {
        let invoices = self.invoices.read().await;
        let mut matching: Vec<Invoice> = invoices
            .values()
            .filter(|invoice| invoice_type.map_or(true, |kind| invoice.invoice_type == kind))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, invoice_type: Option<InvoiceType>) -> Result<u64> {
        let invoices = self.invoices.read().await;
        Ok(invoices
            .values()
            .filter(|invoice| invoice_type.map_or(true, |kind| invoice.invoice_type == kind))
            .count() as u64)
    }

    async fn apply_entry(
        &self,
        id: &str,
        entry: &LedgerEntry,
        expected_version: Option<i64>,
    ) -> Result<LedgerOutcome> {
        let mut invoices = self.invoices.write().await;
        let stored = invoices
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Invoice {}", id)))?;
        check_version(stored, expected_version)?;

        // Work on a copy so a rejected entry leaves the stored invoice untouched
        let mut invoice = stored.clone();
        let applied = entry.apply(&mut invoice)?;
        invoice.version += 1;
        invoice.updated_at = Utc::now();
        *stored = invoice.clone();

        Ok(LedgerOutcome { invoice, applied })
    }
}
