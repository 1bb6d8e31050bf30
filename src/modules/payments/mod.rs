// Payments module: push initiation, callback reconciliation, payment records

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{PaymentRecord, PaymentStatus, StatusUpdate};
pub use repositories::{InMemoryPaymentRepository, MySqlPaymentRepository, PaymentRepository};
pub use services::{CallbackAck, CallbackProcessor, MpesaCallback, PaymentService};
