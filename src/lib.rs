//! Paysettle: invoice ledger and M-Pesa payment reconciliation
//!
//! Keeps a per-order invoice ledger, collects payments through M-Pesa STK push
//! and its asynchronous callbacks, and reverses collected funds with a durable
//! journal and audit trail.

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

// Re-export commonly used types
pub use modules::gateways;
pub use modules::invoices;
pub use modules::payments;
pub use modules::reversals;
pub use modules::{Services, Stores};
