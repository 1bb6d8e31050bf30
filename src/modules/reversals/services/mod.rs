pub mod recovery_worker;
pub mod reversal_service;

pub use recovery_worker::RecoveryWorker;
pub use reversal_service::{RecoveryReport, ReversalService};
