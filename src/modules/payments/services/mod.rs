pub mod callback_processor;
pub mod payment_service;

pub use callback_processor::{CallbackAck, CallbackProcessor, MpesaCallback};
pub use payment_service::{normalize_phone, PaymentService};
