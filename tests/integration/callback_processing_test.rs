// Callback reconciliation against in-memory stores
//
// A completed callback moves the payment record and credits the invoice once;
// duplicates, failures and unknown checkout ids leave the ledger alone.

#[path = "../helpers/mod.rs"]
mod helpers;

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use helpers::*;
use paysettle::core::TimezoneConverter;
use paysettle::modules::payments::models::InitiatePaymentRequest;
use paysettle::payments::{MpesaCallback, PaymentRepository, PaymentStatus};

async fn initiated_payment(harness: &TestHarness) -> (String, String) {
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let response = harness
        .services
        .payments
        .initiate_payment(
            USER,
            InitiatePaymentRequest {
                invoice_id: invoice.id.clone(),
                phone: TEST_PHONE.to_string(),
            },
        )
        .await
        .unwrap();
    (invoice.id, response.checkout_request_id)
}

fn callback(payload: serde_json::Value) -> MpesaCallback {
    serde_json::from_value(payload).unwrap()
}

#[tokio::test]
async fn test_completed_callback_credits_invoice() {
    let harness = TestHarness::new();
    let (invoice_id, checkout_id) = initiated_payment(&harness).await;

    let ack = harness
        .services
        .callbacks
        .process(callback(TestDataFactory::success_callback(
            &checkout_id,
            "NLJ7RT61SV",
            20260208143015,
        )))
        .await;

    assert!(ack.is_accepted());
    assert_eq!(ack.result_desc, "Callback received");

    let record = harness
        .payments
        .find_by_checkout_id(&checkout_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Completed);
    assert_eq!(record.mpesa_receipt_number.as_deref(), Some("NLJ7RT61SV"));
    assert_eq!(record.transaction_date.as_deref(), Some("20260208143015"));

    let invoice = harness.invoice(&invoice_id).await;
    assert_eq!(invoice.paid_amount, dec!(200));
    assert_eq!(
        invoice.paid_on.get(&TestDataFactory::date("2026-02-08")),
        Some(&dec!(200))
    );
    assert!(invoice.is_balanced());
}

#[tokio::test]
async fn test_duplicate_callback_does_not_double_apply() {
    let harness = TestHarness::new();
    let (invoice_id, checkout_id) = initiated_payment(&harness).await;
    let payload = TestDataFactory::success_callback(&checkout_id, "NLJ7RT61SV", 20260208143015);

    let first = harness.services.callbacks.process(callback(payload.clone())).await;
    let second = harness.services.callbacks.process(callback(payload)).await;

    assert!(first.is_accepted());
    assert!(second.is_accepted());
    assert_eq!(harness.invoice(&invoice_id).await.paid_amount, dec!(200));
}

#[tokio::test]
async fn test_concurrent_deliveries_apply_once() {
    let harness = TestHarness::new();
    let (invoice_id, checkout_id) = initiated_payment(&harness).await;
    let payload = TestDataFactory::success_callback(&checkout_id, "NLJ7RT61SV", 20260208143015);

    let processor = Arc::clone(&harness.services.callbacks);
    let acks = join_all((0..5).map(|_| processor.process(callback(payload.clone())))).await;

    assert!(acks.iter().all(|ack| ack.is_accepted()));
    assert_eq!(harness.invoice(&invoice_id).await.paid_amount, dec!(200));
}

#[tokio::test]
async fn test_failed_callback_leaves_ledger_untouched() {
    let harness = TestHarness::new();
    let (invoice_id, checkout_id) = initiated_payment(&harness).await;

    let ack = harness
        .services
        .callbacks
        .process(callback(TestDataFactory::cancelled_callback(&checkout_id)))
        .await;
    assert!(ack.is_accepted());

    let record = harness
        .payments
        .find_by_checkout_id(&checkout_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Failed);
    assert!(record.mpesa_receipt_number.is_none());

    // A late success for a failed attempt is acknowledged and ignored
    let late = harness
        .services
        .callbacks
        .process(callback(TestDataFactory::success_callback(
            &checkout_id,
            "NLJ7RT61SV",
            20260208143015,
        )))
        .await;
    assert!(late.is_accepted());

    let invoice = harness.invoice(&invoice_id).await;
    assert_eq!(invoice.paid_amount, Decimal::ZERO);
    assert!(invoice.paid_on.is_empty());
}

#[tokio::test]
async fn test_unknown_checkout_id_is_rejected_without_mutation() {
    let harness = TestHarness::new();
    let (invoice_id, _) = initiated_payment(&harness).await;

    let ack = harness
        .services
        .callbacks
        .process(callback(TestDataFactory::success_callback(
            "ws_CO_UNKNOWN",
            "NLJ7RT61SV",
            20260208143015,
        )))
        .await;

    assert_eq!(ack.result_code, "1");
    assert_eq!(ack.result_desc, "Payment not found");
    assert_eq!(harness.invoice(&invoice_id).await.paid_amount, Decimal::ZERO);
    assert_eq!(harness.payments.len().await, 1);
}

#[tokio::test]
async fn test_missing_transaction_date_uses_today() {
    let harness = TestHarness::new();
    let (invoice_id, checkout_id) = initiated_payment(&harness).await;

    let payload = serde_json::json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {"Item": [{"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"}]}
            }
        }
    });
    let before = TimezoneConverter::ledger_today(Utc::now());
    let ack = harness.services.callbacks.process(callback(payload)).await;
    let after = TimezoneConverter::ledger_today(Utc::now());

    assert!(ack.is_accepted());
    let invoice = harness.invoice(&invoice_id).await;
    let (date, amount) = invoice.paid_on.iter().next().unwrap();
    assert!(*date == before || *date == after);
    assert_eq!(*amount, dec!(200));
}
