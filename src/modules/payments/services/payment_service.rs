use std::sync::Arc;

use crate::core::{AppError, Result};
use crate::modules::gateways::{MobileMoneyGateway, PushRequest};
use crate::modules::invoices::services::InvoiceService;
use crate::modules::orders::OrderRepository;
use crate::modules::payments::models::{
    InitiatePaymentRequest, InitiatePaymentResponse, PaymentRecord, StatusUpdate,
};
use crate::modules::payments::repositories::PaymentRepository;

/// Minimum MSISDN length accepted for a push (e.g. `254712345678`)
const MIN_PHONE_DIGITS: usize = 10;

/// Normalize a payer phone number to digits only
pub fn normalize_phone(raw: &str) -> Result<String> {
    let phone = raw.trim();
    let phone = phone.strip_prefix('+').unwrap_or(phone);

    if phone.len() < MIN_PHONE_DIGITS || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(format!(
            "Invalid phone number '{}': expected at least {} digits",
            raw, MIN_PHONE_DIGITS
        )));
    }

    Ok(phone.to_string())
}

/// Service for payment attempts and their state machine
pub struct PaymentService {
    payment_repo: Arc<dyn PaymentRepository>,
    invoice_service: Arc<InvoiceService>,
    order_repo: Arc<dyn OrderRepository>,
    gateway: Option<Arc<dyn MobileMoneyGateway>>,
}

impl PaymentService {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        invoice_service: Arc<InvoiceService>,
        order_repo: Arc<dyn OrderRepository>,
        gateway: Option<Arc<dyn MobileMoneyGateway>>,
    ) -> Self {
        Self {
            payment_repo,
            invoice_service,
            order_repo,
            gateway,
        }
    }

    /// Push a payment prompt for the invoice amount to the customer's phone.
    ///
    /// Only the owner of the invoice's order may pay it. The `initiated` record is
    /// written only after the gateway accepted the push.
    pub async fn initiate_payment(
        &self,
        user_id: &str,
        request: InitiatePaymentRequest,
    ) -> Result<InitiatePaymentResponse> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| AppError::configuration("M-Pesa client not configured"))?;

        let phone = normalize_phone(&request.phone)?;
        let invoice = self.invoice_service.get_invoice(&request.invoice_id).await?;

        self.order_repo.find_owned(&invoice.order_id, user_id).await?;

        let accepted = gateway
            .initiate_push(PushRequest {
                phone: phone.clone(),
                amount: invoice.invoice_amount,
                invoice_id: invoice.id.clone(),
            })
            .await?;

        let record = PaymentRecord::initiated(
            accepted.checkout_request_id.clone(),
            accepted.merchant_request_id,
            invoice.invoice_amount,
            phone,
            invoice.id.clone(),
            invoice.order_id.clone(),
        )?;
        self.payment_repo.create(&record).await?;

        tracing::info!(
            payment_id = %record.id,
            invoice_id = %invoice.id,
            checkout_request_id = %record.checkout_request_id,
            gateway = gateway.name(),
            "Payment initiated"
        );

        Ok(InitiatePaymentResponse {
            checkout_request_id: record.checkout_request_id,
            customer_message: accepted.customer_message,
            payment_id: record.id,
        })
    }

    /// Payment record visible only to the owner of its order
    pub async fn get_payment(&self, user_id: &str, id: &str) -> Result<PaymentRecord> {
        let record = self
            .payment_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {}", id)))?;

        self.order_repo.find_owned(&record.order_id, user_id).await?;

        Ok(record)
    }

    pub async fn find_by_checkout_id(&self, checkout_request_id: &str) -> Result<Option<PaymentRecord>> {
        self.payment_repo.find_by_checkout_id(checkout_request_id).await
    }

    /// Advance a record along the state machine.
    ///
    /// `NotFound` for an unknown checkout id; `Conflict` for an illegal transition
    /// or when another writer moved the record first.
    pub async fn update_payment_status(
        &self,
        checkout_request_id: &str,
        update: StatusUpdate,
    ) -> Result<PaymentRecord> {
        let current = self
            .payment_repo
            .find_by_checkout_id(checkout_request_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {}", checkout_request_id)))?;

        current.status.ensure_transition(update.status)?;

        let changed = self
            .payment_repo
            .transition(checkout_request_id, current.status, &update)
            .await?;
        if !changed {
            return Err(AppError::conflict(format!(
                "Payment {} changed concurrently",
                checkout_request_id
            )));
        }

        tracing::info!(
            checkout_request_id = %checkout_request_id,
            from = %current.status,
            to = %update.status,
            "Payment status updated"
        );

        self.payment_repo
            .find_by_checkout_id(checkout_request_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment {}", checkout_request_id)))
    }

    /// Mark every completed payment of an invoice as reversed
    pub async fn reverse_by_invoice(&self, invoice_id: &str) -> Result<u64> {
        let count = self
            .payment_repo
            .reverse_completed_by_invoice(invoice_id)
            .await?;

        tracing::info!(invoice_id = %invoice_id, count = count, "Payment records reversed");
        Ok(count)
    }
}
