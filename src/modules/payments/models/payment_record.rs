use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};

/// Payment attempt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Push sent, waiting for the gateway callback
    Initiated,

    /// Customer approved and the gateway confirmed
    Completed,

    /// Customer declined, timed out, or the gateway failed the attempt
    Failed,

    /// Funds returned by an administrator reversal
    Reversed,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Initiated
    }
}

impl PaymentStatus {
    /// `initiated -> completed | failed`, `completed -> reversed`
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Initiated, PaymentStatus::Completed)
                | (PaymentStatus::Initiated, PaymentStatus::Failed)
                | (PaymentStatus::Completed, PaymentStatus::Reversed)
        )
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Reversed)
    }

    /// Reject an illegal transition with a conflict
    pub fn ensure_transition(self, next: PaymentStatus) -> Result<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::conflict(format!(
                "Invalid payment status transition from {} to {}",
                self, next
            )))
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Initiated => write!(f, "initiated"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Reversed => write!(f, "reversed"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(PaymentStatus::Initiated),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            "reversed" => Ok(PaymentStatus::Reversed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// One push payment attempt, keyed by the gateway checkout request id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,

    /// Gateway-issued correlation id used by the callback
    pub checkout_request_id: String,

    pub merchant_request_id: String,

    pub amount: Decimal,

    pub phone: String,

    pub invoice_id: String,

    pub order_id: String,

    pub status: PaymentStatus,

    /// Set only on successful completion
    pub mpesa_receipt_number: Option<String>,

    /// Gateway timestamp as reported in the callback
    pub transaction_date: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// New `initiated` record for an accepted push
    pub fn initiated(
        checkout_request_id: String,
        merchant_request_id: String,
        amount: Decimal,
        phone: String,
        invoice_id: String,
        order_id: String,
    ) -> Result<Self> {
        if checkout_request_id.trim().is_empty() {
            return Err(AppError::validation("Checkout request ID cannot be empty"));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            checkout_request_id,
            merchant_request_id,
            amount,
            phone,
            invoice_id,
            order_id,
            status: PaymentStatus::Initiated,
            mpesa_receipt_number: None,
            transaction_date: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Status change requested for a payment record
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: PaymentStatus,
    pub receipt_number: Option<String>,
    pub transaction_date: Option<String>,
}

impl StatusUpdate {
    pub fn completed(receipt_number: Option<String>, transaction_date: Option<String>) -> Self {
        Self {
            status: PaymentStatus::Completed,
            receipt_number,
            transaction_date,
        }
    }

    pub fn failed() -> Self {
        Self {
            status: PaymentStatus::Failed,
            receipt_number: None,
            transaction_date: None,
        }
    }

    pub fn reversed() -> Self {
        Self {
            status: PaymentStatus::Reversed,
            receipt_number: None,
            transaction_date: None,
        }
    }
}

/// Customer request body for a push payment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    pub invoice_id: String,
    pub phone: String,
}

/// Response returned once the gateway accepted a push
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    pub checkout_request_id: String,
    pub customer_message: String,
    pub payment_id: String,
}
