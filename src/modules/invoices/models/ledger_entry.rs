use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::invoice::Invoice;
use crate::core::Result;

/// A single ledger mutation, applied atomically by the invoice repository
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEntry {
    Payment { amount: Decimal, date: NaiveDate },
    ReverseAll,
    ReverseAmount { amount: Decimal, date: NaiveDate },
}

/// Invoice state after a ledger mutation
#[derive(Debug, Clone)]
pub struct LedgerOutcome {
    pub invoice: Invoice,

    /// Amount actually moved: the payment, the clamped reversal, or the
    /// balance cleared by a full reversal
    pub applied: Decimal,
}

impl LedgerEntry {
    /// Apply to an invoice in place, returning the amount moved
    pub fn apply(&self, invoice: &mut Invoice) -> Result<Decimal> {
        match self {
            LedgerEntry::Payment { amount, date } => {
                invoice.apply_payment(*amount, *date)?;
                Ok(*amount)
            }
            LedgerEntry::ReverseAll => {
                let cleared = invoice.paid_amount;
                invoice.reverse_all();
                Ok(cleared)
            }
            LedgerEntry::ReverseAmount { amount, date } => invoice.reverse_amount(*amount, *date),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEntry::Payment { .. } => "payment",
            LedgerEntry::ReverseAll => "reverse_all",
            LedgerEntry::ReverseAmount { .. } => "reverse_amount",
        }
    }
}
