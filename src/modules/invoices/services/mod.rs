pub mod invoice_service;

pub use invoice_service::{require_ledger_date, InvoiceService};
