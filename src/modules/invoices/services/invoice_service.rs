use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::core::money::validate_positive;
use crate::core::timezone::parse_ledger_date;
use crate::core::{AppError, Result};
use crate::modules::invoices::models::{
    Invoice, InvoiceListResponse, LedgerEntry, LedgerOutcome, ListInvoicesQuery,
};
use crate::modules::invoices::repositories::InvoiceRepository;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Parse a ledger date, rejecting anything but a real `YYYY-MM-DD` calendar date
pub fn require_ledger_date(value: &str) -> Result<NaiveDate> {
    parse_ledger_date(value).ok_or_else(|| {
        AppError::validation(format!("Invalid date '{}': expected YYYY-MM-DD", value))
    })
}

/// Service for invoice ledger operations
pub struct InvoiceService {
    invoice_repo: Arc<dyn InvoiceRepository>,
}

impl InvoiceService {
    pub fn new(invoice_repo: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoice_repo }
    }

    /// Create the payable invoice for a newly placed order
    pub async fn create_invoice(
        &self,
        order_id: &str,
        invoice_amount: Decimal,
        tax_amount: Decimal,
    ) -> Result<Invoice> {
        let invoice = Invoice::new(order_id.to_string(), invoice_amount, tax_amount)?;
        self.invoice_repo.create(&invoice).await?;

        tracing::info!(
            invoice_id = %invoice.id,
            order_id = %invoice.order_id,
            invoice_amount = %invoice.invoice_amount,
            "Invoice created"
        );

        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: &str) -> Result<Invoice> {
        self.invoice_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {}", id)))
    }

    pub async fn get_invoice_by_order(&self, order_id: &str) -> Result<Invoice> {
        self.invoice_repo
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice for order {}", order_id)))
    }

    /// Page through invoices, optionally filtered by type
    pub async fn list_invoices(&self, query: ListInvoicesQuery) -> Result<InvoiceListResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1).saturating_mul(limit);

        let invoices = self
            .invoice_repo
            .list(query.invoice_type, limit, offset)
            .await?;
        let total = self.invoice_repo.count(query.invoice_type).await?;

        Ok(InvoiceListResponse {
            invoices,
            total,
            page,
            limit,
        })
    }

    /// Record a collection; `date` must be `YYYY-MM-DD`
    pub async fn record_payment(&self, id: &str, amount: Decimal, date: &str) -> Result<Invoice> {
        validate_positive(amount, "Payment amount")?;
        let date = require_ledger_date(date)?;

        self.record_payment_on(id, amount, date).await
    }

    pub async fn record_payment_on(
        &self,
        id: &str,
        amount: Decimal,
        date: NaiveDate,
    ) -> Result<Invoice> {
        let outcome = self
            .apply(id, LedgerEntry::Payment { amount, date }, None)
            .await?;
        Ok(outcome.invoice)
    }

    /// Clear the ledger and flip the invoice to receivable.
    ///
    /// `date` is kept for the caller's audit trail only and is not validated.
    pub async fn reverse_all(&self, id: &str, date: &str) -> Result<Invoice> {
        tracing::debug!(invoice_id = %id, date = %date, "Full ledger reversal requested");
        let outcome = self.apply(id, LedgerEntry::ReverseAll, None).await?;
        Ok(outcome.invoice)
    }

    /// Reverse part of the balance; returns the invoice and the amount actually reversed
    pub async fn reverse_amount(
        &self,
        id: &str,
        amount: Decimal,
        date: &str,
    ) -> Result<(Invoice, Decimal)> {
        if amount <= Decimal::ZERO {
            return Err(AppError::validation(
                "Reversal amount must be greater than zero",
            ));
        }
        let date = require_ledger_date(date)?;

        let outcome = self
            .apply(id, LedgerEntry::ReverseAmount { amount, date }, None)
            .await?;
        Ok((outcome.invoice, outcome.applied))
    }

    /// Apply a ledger entry, optionally guarded by the version the caller last saw
    pub async fn apply(
        &self,
        id: &str,
        entry: LedgerEntry,
        expected_version: Option<i64>,
    ) -> Result<LedgerOutcome> {
        self.invoice_repo
            .apply_entry(id, &entry, expected_version)
            .await
    }
}
