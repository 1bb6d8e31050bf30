mod reversal_intent;
mod reversal_record;

pub use reversal_intent::{ReversalIntent, ReversalPlan, ReversalStage};
pub use reversal_record::{ReversalRecord, ReverseInvoiceRequest, ReverseInvoiceResponse};
