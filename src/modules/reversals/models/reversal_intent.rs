// Durable journal entry for one reversal.
//
// A reversal touches the gateway, the invoice ledger, the payment records and
// the audit log; none of these share a transaction. The intent records how far
// the operation got so an interrupted reversal can be finished or abandoned.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::reversal_record::ReversalRecord;

/// Progress of a reversal, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalStage {
    Opened,
    GatewayConfirmed,
    LedgerApplied,
    PaymentsReversed,
    Completed,
    Aborted,
}

impl ReversalStage {
    /// Still waiting for work
    pub fn is_open(self) -> bool {
        !matches!(self, ReversalStage::Completed | ReversalStage::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReversalStage::Opened => "opened",
            ReversalStage::GatewayConfirmed => "gateway_confirmed",
            ReversalStage::LedgerApplied => "ledger_applied",
            ReversalStage::PaymentsReversed => "payments_reversed",
            ReversalStage::Completed => "completed",
            ReversalStage::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for ReversalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReversalStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opened" => Ok(ReversalStage::Opened),
            "gateway_confirmed" => Ok(ReversalStage::GatewayConfirmed),
            "ledger_applied" => Ok(ReversalStage::LedgerApplied),
            "payments_reversed" => Ok(ReversalStage::PaymentsReversed),
            "completed" => Ok(ReversalStage::Completed),
            "aborted" => Ok(ReversalStage::Aborted),
            _ => Err(format!("Invalid reversal stage: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReversalIntent {
    pub id: String,
    pub invoice_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub phone: Option<String>,
    pub admin_id: String,
    pub reason: String,

    /// Clears the whole balance and reverses the payment records
    pub full: bool,

    pub use_gateway: bool,

    /// Invoice version the ledger step must still see
    pub expected_version: i64,

    pub stage: ReversalStage,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolved parameters of a reversal about to start
#[derive(Debug, Clone)]
pub struct ReversalPlan {
    pub invoice_id: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub phone: Option<String>,
    pub admin_id: String,
    pub reason: String,
    pub full: bool,
    pub use_gateway: bool,
    pub expected_version: i64,
}

impl ReversalIntent {
    pub fn open(plan: ReversalPlan) -> Self {
        let now = Utc::now();
        Self {
            id: format!("rev_{}", Uuid::new_v4().simple()),
            invoice_id: plan.invoice_id,
            amount: plan.amount,
            date: plan.date,
            phone: plan.phone,
            admin_id: plan.admin_id,
            reason: plan.reason,
            full: plan.full,
            use_gateway: plan.use_gateway,
            expected_version: plan.expected_version,
            stage: ReversalStage::Opened,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Audit entry written when the intent completes
    pub fn to_record(&self) -> ReversalRecord {
        ReversalRecord {
            id: self.id.clone(),
            invoice_id: self.invoice_id.clone(),
            amount: self.amount,
            date: self.date,
            phone: self.phone.clone(),
            admin_id: self.admin_id.clone(),
            reason: self.reason.clone(),
            created_at: self.created_at,
        }
    }
}
