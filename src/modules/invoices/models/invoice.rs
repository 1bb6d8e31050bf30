// Invoice ledger model
//
// One invoice per order. `paid_on` keeps a signed amount per calendar date:
// collections are positive, reversals negative, and writes to the same date
// accumulate. `paid_amount` always equals the sum of `paid_on`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::money::validate_positive;
use crate::core::{AppError, Result};

/// Direction of money owed on an invoice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceType {
    /// Customer owes money
    Payable,

    /// Money is owed back to the customer
    Receivable,
}

impl Default for InvoiceType {
    fn default() -> Self {
        InvoiceType::Payable
    }
}

impl std::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceType::Payable => write!(f, "payable"),
            InvoiceType::Receivable => write!(f, "receivable"),
        }
    }
}

impl std::str::FromStr for InvoiceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "payable" => Ok(InvoiceType::Payable),
            "receivable" => Ok(InvoiceType::Receivable),
            _ => Err(format!("Invalid invoice type: {}", s)),
        }
    }
}

/// Per-order financial ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,

    /// Unique per order
    pub order_id: String,

    /// Fixed total owed, immutable after creation
    pub invoice_amount: Decimal,

    /// Running total collected
    pub paid_amount: Decimal,

    /// Signed amount per `YYYY-MM-DD` date
    pub paid_on: BTreeMap<NaiveDate, Decimal>,

    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,

    /// Informational only
    pub tax_amount: Decimal,

    /// Incremented on every ledger mutation
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Create an unpaid, payable invoice for an order
    pub fn new(order_id: String, invoice_amount: Decimal, tax_amount: Decimal) -> Result<Self> {
        if order_id.trim().is_empty() {
            return Err(AppError::validation("Order ID cannot be empty"));
        }
        validate_positive(invoice_amount, "Invoice amount")?;
        if tax_amount < Decimal::ZERO {
            return Err(AppError::validation("Tax amount cannot be negative"));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            order_id,
            invoice_amount,
            paid_amount: Decimal::ZERO,
            paid_on: BTreeMap::new(),
            invoice_type: InvoiceType::Payable,
            tax_amount,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Record a collection against a date
    pub fn apply_payment(&mut self, amount: Decimal, date: NaiveDate) -> Result<()> {
        validate_positive(amount, "Payment amount")?;

        self.paid_amount += amount;
        *self.paid_on.entry(date).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    /// Clear every collection and flip the invoice to receivable
    pub fn reverse_all(&mut self) {
        self.paid_amount = Decimal::ZERO;
        self.paid_on.clear();
        self.invoice_type = InvoiceType::Receivable;
    }

    /// Reverse part of the collected balance.
    ///
    /// Requests above the current balance are clamped to it. Returns the amount
    /// actually reversed.
    pub fn reverse_amount(&mut self, amount: Decimal, date: NaiveDate) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(AppError::validation(
                "Reversal amount must be greater than zero",
            ));
        }

        let applied = amount.min(self.paid_amount);
        if applied > Decimal::ZERO {
            self.paid_amount -= applied;
            *self.paid_on.entry(date).or_insert(Decimal::ZERO) -= applied;
        }

        if self.paid_amount <= Decimal::ZERO {
            self.invoice_type = InvoiceType::Receivable;
        }

        Ok(applied)
    }

    /// Sum of all dated entries
    pub fn ledger_total(&self) -> Decimal {
        self.paid_on.values().copied().sum()
    }

    /// `paid_amount` matches the dated entries and is not negative
    pub fn is_balanced(&self) -> bool {
        self.paid_amount >= Decimal::ZERO && self.paid_amount == self.ledger_total()
    }

    pub fn is_payable(&self) -> bool {
        self.invoice_type == InvoiceType::Payable
    }
}

/// Admin request body for a manual payment entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub date: String,
}

/// Query parameters for the admin invoice listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListInvoicesQuery {
    #[serde(rename = "type")]
    pub invoice_type: Option<InvoiceType>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Paginated invoice listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListResponse {
    pub invoices: Vec<Invoice>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}
