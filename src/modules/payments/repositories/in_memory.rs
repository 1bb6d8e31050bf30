use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::payment_repository::PaymentRepository;
use crate::core::{AppError, Result};
use crate::modules::payments::models::{PaymentRecord, PaymentStatus, StatusUpdate};

/// A thread-safe in-memory payment record store keyed by checkout request id
#[derive(Default, Clone)]
pub struct InMemoryPaymentRepository {
    records: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, record: &PaymentRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.checkout_request_id) {
            return Err(AppError::conflict(format!(
                "Payment record for checkout {} already exists",
                record.checkout_request_id
            )));
        }
        records.insert(record.checkout_request_id.clone(), record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.values().find(|record| record.id == id).cloned())
    }

    async fn find_by_checkout_id(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<PaymentRecord>> {
        let records = self.records.read().await;
        Ok(records.get(checkout_request_id).cloned())
    }

    async fn transition(
        &self,
        checkout_request_id: &str,
        from: PaymentStatus,
        update: &StatusUpdate,
    ) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(checkout_request_id) else {
            return Ok(false);
        };
        if record.status != from {
            return Ok(false);
        }

        record.status = update.status;
        if update.receipt_number.is_some() {
            record.mpesa_receipt_number = update.receipt_number.clone();
        }
        if update.transaction_date.is_some() {
            record.transaction_date = update.transaction_date.clone();
        }
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn reverse_completed_by_invoice(&self, invoice_id: &str) -> Result<u64> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let mut count = 0;
        for record in records.values_mut().filter(|record| {
            record.invoice_id == invoice_id && record.status == PaymentStatus::Completed
        }) {
            record.status = PaymentStatus::Reversed;
            record.updated_at = now;
            count += 1;
        }
        Ok(count)
    }
}
