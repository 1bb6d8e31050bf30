use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::error::AppError;
use crate::middleware::UserId;
use crate::modules::payments::models::InitiatePaymentRequest;
use crate::modules::payments::services::PaymentService;

/// Push a payment prompt to the customer's phone
/// POST /payments
pub async fn initiate_payment(
    service: web::Data<Arc<PaymentService>>,
    user_id: UserId,
    request: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let response = service
        .initiate_payment(&user_id.0, request.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(response))
}

/// Get a payment record
/// GET /payments/{id}
pub async fn get_payment(
    service: web::Data<Arc<PaymentService>>,
    user_id: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let payment_id = path.into_inner();
    let record = service.get_payment(&user_id.0, &payment_id).await?;

    Ok(HttpResponse::Ok().json(record))
}

/// Configure payment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::post().to(initiate_payment))
            .route("/{id}", web::get().to(get_payment)),
    );
}
