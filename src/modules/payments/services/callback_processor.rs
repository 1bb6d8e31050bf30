// Gateway callback reconciliation
//
// The gateway retries deliveries it considers unacknowledged, so every outcome
// past the JSON parse is answered with HTTP 200 and a `ResultCode`; internal
// failures after the status update are logged only.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::timezone::parse_gateway_date;
use crate::core::{AppError, TimezoneConverter};
use crate::modules::invoices::services::InvoiceService;
use crate::modules::payments::models::{PaymentStatus, StatusUpdate};
use crate::modules::payments::services::PaymentService;

const RECEIPT_ITEM: &str = "MpesaReceiptNumber";
const TRANSACTION_DATE_ITEM: &str = "TransactionDate";

/// Inbound STK callback envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaCallback {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,

    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,

    /// `0` means the customer completed the payment
    #[serde(rename = "ResultCode", deserialize_with = "result_code")]
    pub result_code: i64,

    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,

    #[serde(rename = "CallbackMetadata", default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Value", default)]
    pub value: Option<serde_json::Value>,
}

/// Acknowledgement body returned to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: String,

    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        Self {
            result_code: "0".to_string(),
            result_desc: "Callback received".to_string(),
        }
    }

    pub fn rejected(desc: &str) -> Self {
        Self {
            result_code: "1".to_string(),
            result_desc: desc.to_string(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.result_code == "0"
    }
}

fn result_code<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom("ResultCode must be an integer")),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid ResultCode: {}", s))),
        other => Err(D::Error::custom(format!("invalid ResultCode: {}", other))),
    }
}

impl CallbackMetadata {
    /// Value of a named item rendered as text
    pub fn item(&self, name: &str) -> Option<String> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .and_then(|item| item.value.as_ref())
            .and_then(|value| match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .filter(|value| !value.is_empty())
    }
}

/// Ledger date for a completed payment: the gateway's transaction date, or
/// today in gateway time when it is absent or unreadable
pub fn settlement_date(transaction_date: Option<&str>) -> NaiveDate {
    transaction_date
        .and_then(parse_gateway_date)
        .unwrap_or_else(|| TimezoneConverter::ledger_today(Utc::now()))
}

/// Reconciles gateway callbacks into payment records and the ledger
pub struct CallbackProcessor {
    payment_service: Arc<PaymentService>,
    invoice_service: Arc<InvoiceService>,
}

impl CallbackProcessor {
    pub fn new(payment_service: Arc<PaymentService>, invoice_service: Arc<InvoiceService>) -> Self {
        Self {
            payment_service,
            invoice_service,
        }
    }

    pub async fn process(&self, callback: MpesaCallback) -> CallbackAck {
        let stk = callback.body.stk_callback;
        let checkout_id = stk.checkout_request_id.as_str();

        let record = match self.payment_service.find_by_checkout_id(checkout_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(
                    checkout_request_id = %checkout_id,
                    "Callback for unknown checkout request"
                );
                return CallbackAck::rejected("Payment not found");
            }
            Err(e) => {
                tracing::error!(
                    checkout_request_id = %checkout_id,
                    error = %e,
                    "Payment lookup failed during callback"
                );
                return CallbackAck::rejected("Payment lookup failed");
            }
        };

        if record.status != PaymentStatus::Initiated {
            tracing::info!(
                checkout_request_id = %checkout_id,
                status = %record.status,
                "Duplicate callback ignored"
            );
            return CallbackAck::accepted();
        }

        let update = if stk.result_code == 0 {
            let metadata = stk.callback_metadata.unwrap_or_default();
            StatusUpdate::completed(
                metadata.item(RECEIPT_ITEM),
                metadata.item(TRANSACTION_DATE_ITEM),
            )
        } else {
            tracing::info!(
                checkout_request_id = %checkout_id,
                result_code = stk.result_code,
                result_desc = %stk.result_desc,
                "Payment failed at gateway"
            );
            StatusUpdate::failed()
        };

        let updated = match self
            .payment_service
            .update_payment_status(checkout_id, update)
            .await
        {
            Ok(updated) => updated,
            Err(AppError::Conflict(_)) => {
                // A concurrent delivery already moved the record
                tracing::info!(
                    checkout_request_id = %checkout_id,
                    "Callback raced with another delivery"
                );
                return CallbackAck::accepted();
            }
            Err(e) => {
                tracing::error!(
                    checkout_request_id = %checkout_id,
                    error = %e,
                    "Failed to update payment from callback"
                );
                return CallbackAck::rejected("Failed to update payment");
            }
        };

        if updated.status == PaymentStatus::Completed {
            self.credit_invoice(&updated.invoice_id, updated.transaction_date.as_deref())
                .await;
        }

        CallbackAck::accepted()
    }

    async fn credit_invoice(&self, invoice_id: &str, transaction_date: Option<&str>) {
        let invoice = match self.invoice_service.get_invoice(invoice_id).await {
            Ok(invoice) => invoice,
            Err(e) => {
                tracing::error!(
                    invoice_id = %invoice_id,
                    error = %e,
                    "Invoice lookup failed for completed payment"
                );
                return;
            }
        };

        let date = settlement_date(transaction_date);

        // NOTE: credits the invoice's full amount, not the payment record amount.
        // Two successful pushes against one invoice are both credited in full.
        if let Err(e) = self
            .invoice_service
            .record_payment_on(invoice_id, invoice.invoice_amount, date)
            .await
        {
            tracing::error!(
                invoice_id = %invoice_id,
                error = %e,
                "Failed to record payment on invoice"
            );
        }
    }
}
