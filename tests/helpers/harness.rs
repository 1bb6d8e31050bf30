// In-memory application wiring
//
// Builds the same `Services` graph main.rs builds, but over in-memory stores
// whose concrete handles stay reachable for assertions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use paysettle::core::{AppError, Result};
use paysettle::gateways::MobileMoneyGateway;
use paysettle::invoices::{InMemoryInvoiceRepository, Invoice};
use paysettle::modules::orders::{InMemoryOrderRepository, Order};
use paysettle::payments::InMemoryPaymentRepository;
use paysettle::reversals::{
    InMemoryReversalJournal, InMemoryReversalRepository, ReversalRecord, ReversalRepository,
};
use paysettle::{Services, Stores};

use super::fake_gateway::FakeGateway;
use super::test_data::TestDataFactory;

pub const USER: &str = "user-1";
pub const OTHER_USER: &str = "user-2";
pub const ADMIN: &str = "admin-1";

/// Audit log that can be switched to fail every append
#[derive(Default, Clone)]
pub struct FlakyReversalRepository {
    inner: InMemoryReversalRepository,
    failing: Arc<AtomicBool>,
}

impl FlakyReversalRepository {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[async_trait]
impl ReversalRepository for FlakyReversalRepository {
    async fn append(&self, record: &ReversalRecord) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::Timeout(
                "reversal_records.append exceeded 10000ms".to_string(),
            ));
        }
        self.inner.append(record).await
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalRecord>> {
        self.inner.find_by_invoice(invoice_id).await
    }
}

pub struct TestHarness {
    pub invoices: InMemoryInvoiceRepository,
    pub payments: InMemoryPaymentRepository,
    pub orders: InMemoryOrderRepository,
    pub reversals: FlakyReversalRepository,
    pub journal: InMemoryReversalJournal,
    pub gateway: Option<Arc<FakeGateway>>,
    pub services: Services,
}

impl TestHarness {
    /// Harness with a working fake gateway
    pub fn new() -> Self {
        Self::build(Some(Arc::new(FakeGateway::new())))
    }

    /// Harness where the gateway is not configured at all
    pub fn without_gateway() -> Self {
        Self::build(None)
    }

    fn build(gateway: Option<Arc<FakeGateway>>) -> Self {
        let invoices = InMemoryInvoiceRepository::default();
        let payments = InMemoryPaymentRepository::default();
        let orders = InMemoryOrderRepository::default();
        let reversals = FlakyReversalRepository::default();
        let journal = InMemoryReversalJournal::default();

        let stores = Stores {
            invoices: Arc::new(invoices.clone()),
            payments: Arc::new(payments.clone()),
            orders: Arc::new(orders.clone()),
            reversals: Arc::new(reversals.clone()),
            journal: Arc::new(journal.clone()),
        };
        let dyn_gateway = gateway
            .clone()
            .map(|gateway| gateway as Arc<dyn MobileMoneyGateway>);

        Self {
            invoices,
            payments,
            orders,
            reversals,
            journal,
            gateway,
            services: Services::build(stores, dyn_gateway),
        }
    }

    pub fn gateway(&self) -> &FakeGateway {
        self.gateway.as_deref().expect("harness built with a gateway")
    }

    /// Order owned by `user_id` with its payable invoice
    pub async fn seed_invoice(&self, user_id: &str, amount: Decimal) -> (Order, Invoice) {
        let order = TestDataFactory::order(user_id, amount);
        self.orders.insert(order.clone()).await;

        let invoice = self
            .services
            .invoices
            .create_invoice(&order.id, amount, Decimal::ZERO)
            .await
            .expect("invoice created");
        (order, invoice)
    }

    pub async fn invoice(&self, id: &str) -> Invoice {
        self.services
            .invoices
            .get_invoice(id)
            .await
            .expect("invoice exists")
    }
}
