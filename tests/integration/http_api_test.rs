// HTTP surface over the in-memory harness

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use helpers::*;
use paysettle::invoices::{Invoice, InvoiceType};
use paysettle::middleware::{ADMIN_ID_HEADER, USER_ID_HEADER};
use paysettle::payments::PaymentStatus;
use paysettle::reversals::{ReversalIntent, ReversalRecord, ReversalStage};

macro_rules! app {
    ($harness:expr) => {{
        let services = $harness.services.clone();
        test::init_service(App::new().configure(move |cfg| services.configure(cfg))).await
    }};
}

#[actix_web::test]
async fn test_callback_for_unknown_checkout_is_acknowledged() {
    let harness = TestHarness::new();
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/mpesa/callback")
        .set_json(TestDataFactory::success_callback(
            "ws_CO_UNKNOWN",
            "NLJ7RT61SV",
            20260208143015,
        ))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ResultCode"], "1");
    assert_eq!(body["ResultDesc"], "Payment not found");
}

#[actix_web::test]
async fn test_malformed_callback_is_bad_request() {
    let harness = TestHarness::new();
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/mpesa/callback")
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"Body\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_payment_push_and_callback_round() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .insert_header((USER_ID_HEADER, USER))
        .set_json(json!({"invoiceId": &invoice.id, "phone": "+254708374149"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let checkout_id = body["checkoutRequestId"].as_str().unwrap().to_string();
    let payment_id = body["paymentId"].as_str().unwrap().to_string();
    assert_eq!(harness.gateway().pushes()[0].phone, TEST_PHONE);

    let callback = TestDataFactory::success_callback(&checkout_id, "NLJ7RT61SV", 20260208143015);
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/mpesa/callback")
            .set_json(&callback)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["ResultCode"], "0");
    }

    // Redelivery does not credit twice
    let invoice = harness.invoice(&invoice.id).await;
    assert_eq!(invoice.paid_amount, dec!(200));

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/payments/{}", payment_id))
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], json!(PaymentStatus::Completed));

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/payments/{}", payment_id))
        .insert_header((USER_ID_HEADER, OTHER_USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_payment_requires_user_header() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let app = app!(harness);

    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .set_json(json!({"invoiceId": &invoice.id, "phone": TEST_PHONE}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.gateway().push_count(), 0);
}

#[actix_web::test]
async fn test_invoice_visible_to_owner_only() {
    let harness = TestHarness::new();
    let (order, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let app = app!(harness);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/invoices/{}", invoice.id))
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Invoice = test::read_body_json(resp).await;
    assert_eq!(body.id, invoice.id);
    assert_eq!(body.invoice_amount, dec!(200));

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/orders/{}/invoice", order.id))
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/invoices/{}", invoice.id))
        .insert_header((USER_ID_HEADER, OTHER_USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/v1/invoices/inv-missing")
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], 404);
}

#[actix_web::test]
async fn test_admin_records_payment_and_reverses() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let app = app!(harness);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/invoices/{}/payment", invoice.id))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!({"amount": "100", "date": "2026-02-08"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Invoice = test::read_body_json(resp).await;
    assert_eq!(body.paid_amount, dec!(100));

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/invoices/{}/payment", invoice.id))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!({"amount": "10", "date": "2026-13-01"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/invoices/{}/reverse", invoice.id))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .set_json(json!({"amount": "30", "date": "2026-02-09", "reason": "Overcharge"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let updated: Invoice = serde_json::from_value(body["invoice"].clone()).unwrap();
    assert_eq!(updated.paid_amount, dec!(70));
    assert_eq!(updated.invoice_type, InvoiceType::Payable);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/admin/invoices/{}/reversals", invoice.id))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let records: Vec<ReversalRecord> = test::read_body_json(resp).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, dec!(30));
    assert_eq!(records[0].reason, "Overcharge");
    assert_eq!(records[0].admin_id, ADMIN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/admin/invoices/{}/reversal-intents", invoice.id))
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let intents: Vec<ReversalIntent> = test::read_body_json(resp).await;
    assert_eq!(intents.len(), 1);
    assert_eq!(intents[0].id, records[0].id);
    assert_eq!(intents[0].stage, ReversalStage::Completed);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/invoices/inv-missing/reversal-intents")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_admin_routes_require_admin_header() {
    let harness = TestHarness::new();
    let (_, invoice) = harness.seed_invoice(USER, dec!(200)).await;
    let app = app!(harness);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/invoices/{}/reverse", invoice.id))
        .insert_header((USER_ID_HEADER, USER))
        .set_json(json!({"reason": "Overcharge"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/invoices")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_admin_lists_invoices_by_type() {
    let harness = TestHarness::new();
    let (_, paid) = harness.seed_invoice(USER, dec!(200)).await;
    harness.seed_invoice(OTHER_USER, dec!(50)).await;
    harness
        .services
        .invoices
        .record_payment(&paid.id, dec!(200), "2026-02-08")
        .await
        .unwrap();
    harness
        .services
        .invoices
        .reverse_all(&paid.id, "2026-02-09")
        .await
        .unwrap();
    let app = app!(harness);

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/invoices?type=receivable")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["invoices"][0]["id"], json!(&paid.id));
    assert_eq!(body["invoices"][0]["type"], "receivable");

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/invoices")
        .insert_header((ADMIN_ID_HEADER, ADMIN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 2);
}
