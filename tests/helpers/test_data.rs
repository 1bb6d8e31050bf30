// Test Data Factory
//
// Unique ids per call keep tests isolated inside a shared store.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use paysettle::modules::orders::Order;

pub const TEST_PHONE: &str = "254708374149";

pub struct TestDataFactory;

impl TestDataFactory {
    pub fn random_id(prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4().simple())
    }

    pub fn order(user_id: &str, total_cost: Decimal) -> Order {
        Order {
            id: Self::random_id("order"),
            user_id: user_id.to_string(),
            phone: TEST_PHONE.to_string(),
            total_cost,
            status: "in queue".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
    }

    /// Successful STK callback as the gateway sends it
    pub fn success_callback(checkout_request_id: &str, receipt: &str, transaction_date: u64) -> Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "29115-34620561-1",
                    "CheckoutRequestID": checkout_request_id,
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": {
                        "Item": [
                            {"Name": "Amount", "Value": 100},
                            {"Name": "MpesaReceiptNumber", "Value": receipt},
                            {"Name": "TransactionDate", "Value": transaction_date},
                            {"Name": "PhoneNumber", "Value": 254708374149u64}
                        ]
                    }
                }
            }
        })
    }

    /// Callback for a push the customer cancelled
    pub fn cancelled_callback(checkout_request_id: &str) -> Value {
        json!({
            "Body": {
                "stkCallback": {
                    "MerchantRequestID": "8555-67195-1",
                    "CheckoutRequestID": checkout_request_id,
                    "ResultCode": 1032,
                    "ResultDesc": "Request cancelled by user"
                }
            }
        })
    }
}
