use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::modules::invoices::models::Invoice;

/// Append-only audit entry for one administrator reversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalRecord {
    /// Same id as the intent that produced it
    pub id: String,

    pub invoice_id: String,

    /// Amount actually taken off the ledger
    pub amount: Decimal,

    pub date: NaiveDate,

    pub phone: Option<String>,

    pub admin_id: String,

    pub reason: String,

    pub created_at: DateTime<Utc>,
}

/// Body of `PUT /admin/invoices/{id}/reverse`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseInvoiceRequest {
    /// Zero or absent reverses everything paid
    #[serde(default)]
    pub amount: Option<Decimal>,

    /// `YYYY-MM-DD`; today in gateway time when absent
    #[serde(default)]
    pub date: Option<String>,

    /// Payer MSISDN, required when the gateway reverses the funds
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub use_mpesa: bool,

    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReverseInvoiceResponse {
    pub invoice: Invoice,
    pub reversal: ReversalRecord,
}
