use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::error::AppError;
use crate::middleware::AdminId;
use crate::modules::reversals::models::ReverseInvoiceRequest;
use crate::modules::reversals::services::ReversalService;

/// Reverse collected funds, optionally through the gateway
/// PUT /admin/invoices/{id}/reverse
pub async fn reverse_invoice(
    service: web::Data<Arc<ReversalService>>,
    admin: AdminId,
    path: web::Path<String>,
    request: web::Json<ReverseInvoiceRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let response = service
        .reverse_invoice(&admin.0, &invoice_id, request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// Audit trail of an invoice's reversals
/// GET /admin/invoices/{id}/reversals
pub async fn list_reversals(
    service: web::Data<Arc<ReversalService>>,
    _admin: AdminId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let reversals = service.reversals_for_invoice(&invoice_id).await?;

    Ok(HttpResponse::Ok().json(reversals))
}

/// Journal of an invoice's reversals, with stage and last error
/// GET /admin/invoices/{id}/reversal-intents
pub async fn list_intents(
    service: web::Data<Arc<ReversalService>>,
    _admin: AdminId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let intents = service.intents_for_invoice(&invoice_id).await?;

    Ok(HttpResponse::Ok().json(intents))
}

/// Configure reversal routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/invoices/{id}/reverse", web::put().to(reverse_invoice))
        .route("/admin/invoices/{id}/reversals", web::get().to(list_reversals))
        .route(
            "/admin/invoices/{id}/reversal-intents",
            web::get().to(list_intents),
        );
}
