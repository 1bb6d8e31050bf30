// Reversals module: orchestrated refunds, their journal and audit log

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{ReversalIntent, ReversalRecord, ReversalStage};
pub use repositories::{
    InMemoryReversalJournal, InMemoryReversalRepository, MySqlReversalJournal,
    MySqlReversalRepository, ReversalJournal, ReversalRepository,
};
pub use services::{RecoveryReport, RecoveryWorker, ReversalService};
