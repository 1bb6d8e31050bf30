// Orders module (read-only collaborator)

pub mod models;
pub mod repositories;

pub use models::Order;
pub use repositories::{InMemoryOrderRepository, MySqlOrderRepository, OrderRepository};
