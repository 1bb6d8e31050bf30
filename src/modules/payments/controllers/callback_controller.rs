use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::modules::payments::services::{CallbackProcessor, MpesaCallback};

/// Receive an STK push result from the gateway
/// POST /mpesa/callback
///
/// Always answers 200; the body's `ResultCode` tells the gateway whether the
/// delivery was taken.
pub async fn mpesa_callback(
    processor: web::Data<Arc<CallbackProcessor>>,
    callback: web::Json<MpesaCallback>,
) -> HttpResponse {
    let callback = callback.into_inner();
    tracing::info!(
        checkout_request_id = %callback.body.stk_callback.checkout_request_id,
        result_code = callback.body.stk_callback.result_code,
        "M-Pesa callback received"
    );

    let ack = processor.process(callback).await;
    HttpResponse::Ok().json(ack)
}

/// Configure gateway callback routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/mpesa").route("/callback", web::post().to(mpesa_callback)));
}
