// Invoices module: the invoice ledger and its admin surface

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Invoice, InvoiceType, LedgerEntry, LedgerOutcome};
pub use repositories::{InMemoryInvoiceRepository, InvoiceRepository, MySqlInvoiceRepository};
pub use services::InvoiceService;
