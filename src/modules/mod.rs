pub mod gateways;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod reversals;

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;
use sqlx::MySqlPool;

use gateways::MobileMoneyGateway;
use invoices::{InvoiceRepository, InvoiceService, MySqlInvoiceRepository};
use orders::{MySqlOrderRepository, OrderRepository};
use payments::{CallbackProcessor, MySqlPaymentRepository, PaymentRepository, PaymentService};
use reversals::{
    MySqlReversalJournal, MySqlReversalRepository, ReversalJournal, ReversalRepository,
    ReversalService,
};

/// Storage ports behind the services
#[derive(Clone)]
pub struct Stores {
    pub invoices: Arc<dyn InvoiceRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub reversals: Arc<dyn ReversalRepository>,
    pub journal: Arc<dyn ReversalJournal>,
}

impl Stores {
    /// MySQL repositories sharing one pool, each call bounded by `timeout`
    pub fn mysql(pool: MySqlPool, timeout: Duration) -> Self {
        Self {
            invoices: Arc::new(MySqlInvoiceRepository::new(pool.clone(), timeout)),
            payments: Arc::new(MySqlPaymentRepository::new(pool.clone(), timeout)),
            orders: Arc::new(MySqlOrderRepository::new(pool.clone(), timeout)),
            reversals: Arc::new(MySqlReversalRepository::new(pool.clone(), timeout)),
            journal: Arc::new(MySqlReversalJournal::new(pool, timeout)),
        }
    }
}

/// Wired services shared by every HTTP worker
#[derive(Clone)]
pub struct Services {
    pub invoices: Arc<InvoiceService>,
    pub payments: Arc<PaymentService>,
    pub callbacks: Arc<CallbackProcessor>,
    pub reversals: Arc<ReversalService>,
    pub orders: Arc<dyn OrderRepository>,
}

impl Services {
    pub fn build(stores: Stores, gateway: Option<Arc<dyn MobileMoneyGateway>>) -> Self {
        let invoices = Arc::new(InvoiceService::new(stores.invoices));
        let payments = Arc::new(PaymentService::new(
            stores.payments,
            invoices.clone(),
            stores.orders.clone(),
            gateway.clone(),
        ));
        let callbacks = Arc::new(CallbackProcessor::new(payments.clone(), invoices.clone()));
        let reversals = Arc::new(ReversalService::new(
            invoices.clone(),
            payments.clone(),
            stores.reversals,
            stores.journal,
            gateway,
        ));

        Self {
            invoices,
            payments,
            callbacks,
            reversals,
            orders: stores.orders,
        }
    }

    /// Register shared state and the `/api/v1` routes
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.invoices.clone()))
            .app_data(web::Data::new(self.payments.clone()))
            .app_data(web::Data::new(self.callbacks.clone()))
            .app_data(web::Data::new(self.reversals.clone()))
            .app_data(web::Data::new(self.orders.clone()))
            .service(web::scope("/api/v1").configure(configure_api));
    }
}

/// API routes, mounted under `/api/v1`
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    payments::controllers::callback_controller::configure(cfg);
    payments::controllers::payment_controller::configure(cfg);
    reversals::controllers::reversal_controller::configure(cfg);
    invoices::controllers::invoice_controller::configure(cfg);
}
