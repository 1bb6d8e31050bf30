pub mod in_memory;
pub mod payment_repository;

pub use in_memory::InMemoryPaymentRepository;
pub use payment_repository::{MySqlPaymentRepository, PaymentRepository};
