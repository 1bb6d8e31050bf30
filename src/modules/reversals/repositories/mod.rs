pub mod in_memory;
pub mod reversal_journal;
pub mod reversal_repository;

pub use in_memory::{InMemoryReversalJournal, InMemoryReversalRepository};
pub use reversal_journal::{MySqlReversalJournal, ReversalJournal};
pub use reversal_repository::{MySqlReversalRepository, ReversalRepository};
