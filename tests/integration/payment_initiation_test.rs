// Push initiation and payment record lifecycle

#[path = "../helpers/mod.rs"]
mod helpers;

use rust_decimal_macros::dec;

use helpers::*;
use paysettle::core::AppError;
use paysettle::modules::payments::models::InitiatePaymentRequest;
use paysettle::payments::{PaymentRepository, PaymentStatus, StatusUpdate};

fn request(invoice_id: &str, phone: &str) -> InitiatePaymentRequest {
    InitiatePaymentRequest {
        invoice_id: invoice_id.to_string(),
        phone: phone.to_string(),
    }
}

#[tokio::test]
async fn test_initiate_pushes_invoice_amount_and_records_attempt() {
    let harness = TestHarness::new();
    let (order, invoice) = harness.seed_invoice(USER, dec!(200)).await;

    let response = harness
        .services
        .payments
        .initiate_payment(USER, request(&invoice.id, "+254708374149"))
        .await
        .unwrap();

    let pushes = harness.gateway().pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].amount, dec!(200));
    assert_eq!(pushes[0].phone, TEST_PHONE);
    assert_eq!(pushes[0].invoice_id, invoice.id);

    let record = harness
        .payments
        .find_by_checkout_id(&response.checkout_request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.id, response.payment_id);
    assert_eq!(record.status, PaymentStatus::Initiated);
    assert_eq!(record.amount, dec!(200));
    assert_eq!(record.order_id, order.id);
    assert_eq!(record.merchant_request_id, "29115-34620561-1");
    assert!(record.mpesa_receipt_number.is_none());
}

#[tokio::test]
async fn test_only_order_owner_can_pay() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;

    let result = harness
        .services
        .payments
        .initiate_payment(OTHER_USER, request(&invoice.id, TEST_PHONE))
        .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(harness.gateway().push_count(), 0);
    assert!(harness.payments.is_empty().await);
}

#[tokio::test]
async fn test_unknown_invoice_and_bad_phone() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;

    assert!(matches!(
        harness
            .services
            .payments
            .initiate_payment(USER, request("inv-missing", TEST_PHONE))
            .await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        harness
            .services
            .payments
            .initiate_payment(USER, request(&invoice.id, "07-12"))
            .await,
        Err(AppError::Validation(_))
    ));
    assert_eq!(harness.gateway().push_count(), 0);
}

#[tokio::test]
async fn test_rejected_push_leaves_no_record() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    harness
        .gateway()
        .fail_pushes(GatewayFailure::Rejected("1032 - cancelled".to_string()));

    let result = harness
        .services
        .payments
        .initiate_payment(USER, request(&invoice.id, TEST_PHONE))
        .await;

    assert!(matches!(result, Err(AppError::GatewayRejected(_))));
    assert!(harness.payments.is_empty().await);
}

#[tokio::test]
async fn test_transport_failure_leaves_no_record() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    harness
        .gateway()
        .fail_pushes(GatewayFailure::Transport("connection reset".to_string()));

    let result = harness
        .services
        .payments
        .initiate_payment(USER, request(&invoice.id, TEST_PHONE))
        .await;

    assert!(matches!(result, Err(AppError::Gateway(_))));
    assert!(harness.payments.is_empty().await);
}

#[tokio::test]
async fn test_push_without_gateway_is_config_error() {
    let harness = TestHarness::without_gateway();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;

    let result = harness
        .services
        .payments
        .initiate_payment(USER, request(&invoice.id, TEST_PHONE))
        .await;

    assert!(matches!(result, Err(AppError::Configuration(_))));
}

#[tokio::test]
async fn test_get_payment_is_owner_only() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let response = harness
        .services
        .payments
        .initiate_payment(USER, request(&invoice.id, TEST_PHONE))
        .await
        .unwrap();

    let record = harness
        .services
        .payments
        .get_payment(USER, &response.payment_id)
        .await
        .unwrap();
    assert_eq!(record.checkout_request_id, response.checkout_request_id);

    assert!(matches!(
        harness
            .services
            .payments
            .get_payment(OTHER_USER, &response.payment_id)
            .await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        harness.services.payments.get_payment(USER, "missing").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_status_updates_follow_state_machine() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let response = harness
        .services
        .payments
        .initiate_payment(USER, request(&invoice.id, TEST_PHONE))
        .await
        .unwrap();
    let checkout_id = response.checkout_request_id;
    let payments = &harness.services.payments;

    assert!(matches!(
        payments
            .update_payment_status(&checkout_id, StatusUpdate::reversed())
            .await,
        Err(AppError::Conflict(_))
    ));
    assert!(matches!(
        payments
            .update_payment_status("ws_CO_UNKNOWN", StatusUpdate::failed())
            .await,
        Err(AppError::NotFound(_))
    ));

    let completed = payments
        .update_payment_status(
            &checkout_id,
            StatusUpdate::completed(Some("NLJ7RT61SV".to_string()), None),
        )
        .await
        .unwrap();
    assert_eq!(completed.status, PaymentStatus::Completed);

    assert!(matches!(
        payments
            .update_payment_status(&checkout_id, StatusUpdate::failed())
            .await,
        Err(AppError::Conflict(_))
    ));

    assert_eq!(payments.reverse_by_invoice(&invoice.id).await.unwrap(), 1);
    assert_eq!(payments.reverse_by_invoice(&invoice.id).await.unwrap(), 0);

    let reversed = harness
        .payments
        .find_by_checkout_id(&checkout_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reversed.status, PaymentStatus::Reversed);
    assert_eq!(reversed.mpesa_receipt_number.as_deref(), Some("NLJ7RT61SV"));
}
