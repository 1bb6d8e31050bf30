mod payment_record;

pub use payment_record::{
    InitiatePaymentRequest, InitiatePaymentResponse, PaymentRecord, PaymentStatus, StatusUpdate,
};
