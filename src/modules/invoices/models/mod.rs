mod invoice;
mod ledger_entry;

pub use invoice::{
    Invoice, InvoiceListResponse, InvoiceType, ListInvoicesQuery, RecordPaymentRequest,
};
pub use ledger_entry::{LedgerEntry, LedgerOutcome};
