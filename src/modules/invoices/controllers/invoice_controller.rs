use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::error::AppError;
use crate::middleware::{AdminId, UserId};
use crate::modules::invoices::models::{ListInvoicesQuery, RecordPaymentRequest};
use crate::modules::invoices::services::InvoiceService;
use crate::modules::orders::OrderRepository;

/// Get invoice by ID
/// GET /invoices/{id}
pub async fn get_invoice(
    service: web::Data<Arc<InvoiceService>>,
    orders: web::Data<Arc<dyn OrderRepository>>,
    user_id: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let invoice = service.get_invoice(&invoice_id).await?;
    orders.find_owned(&invoice.order_id, &user_id.0).await?;

    Ok(HttpResponse::Ok().json(invoice))
}

/// Get the invoice raised for an order
/// GET /orders/{id}/invoice
pub async fn get_order_invoice(
    service: web::Data<Arc<InvoiceService>>,
    orders: web::Data<Arc<dyn OrderRepository>>,
    user_id: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    orders.find_owned(&order_id, &user_id.0).await?;
    let invoice = service.get_invoice_by_order(&order_id).await?;

    Ok(HttpResponse::Ok().json(invoice))
}

/// List invoices
/// GET /admin/invoices?type=&page=&limit=
pub async fn list_invoices(
    service: web::Data<Arc<InvoiceService>>,
    _admin: AdminId,
    query: web::Query<ListInvoicesQuery>,
) -> Result<HttpResponse, AppError> {
    let listing = service.list_invoices(query.into_inner()).await?;

    Ok(HttpResponse::Ok().json(listing))
}

/// Record a payment collected outside the gateway
/// PUT /admin/invoices/{id}/payment
pub async fn record_payment(
    service: web::Data<Arc<InvoiceService>>,
    admin: AdminId,
    path: web::Path<String>,
    request: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let invoice_id = path.into_inner();
    let request = request.into_inner();

    let invoice = service
        .record_payment(&invoice_id, request.amount, &request.date)
        .await?;

    tracing::info!(
        invoice_id = %invoice_id,
        admin_id = %admin.0,
        amount = %request.amount,
        "Manual payment recorded"
    );

    Ok(HttpResponse::Ok().json(invoice))
}

/// Configure invoice routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/invoices/{id}", web::get().to(get_invoice))
        .route("/orders/{id}/invoice", web::get().to(get_order_invoice))
        .route("/admin/invoices", web::get().to(list_invoices))
        .route("/admin/invoices/{id}/payment", web::put().to(record_payment));
}
