use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::reversal_journal::ReversalJournal;
use super::reversal_repository::ReversalRepository;
use crate::core::{AppError, Result};
use crate::modules::reversals::models::{ReversalIntent, ReversalRecord, ReversalStage};

/// In-memory reversal audit log
#[derive(Default, Clone)]
pub struct InMemoryReversalRepository {
    records: Arc<RwLock<HashMap<String, ReversalRecord>>>,
}

impl InMemoryReversalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ReversalRepository for InMemoryReversalRepository {
    async fn append(&self, record: &ReversalRecord) -> Result<()> {
        let mut records = self.records.write().await;
        records
            .entry(record.id.clone())
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<ReversalRecord> = records
            .values()
            .filter(|record| record.invoice_id == invoice_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }
}

/// In-memory reversal journal
#[derive(Default, Clone)]
pub struct InMemoryReversalJournal {
    intents: Arc<RwLock<HashMap<String, ReversalIntent>>>,
}

impl InMemoryReversalJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift an intent's timestamps into the past, as if it had stalled
    pub async fn backdate(&self, id: &str, by: chrono::Duration) {
        if let Some(intent) = self.intents.write().await.get_mut(id) {
            intent.created_at -= by;
            intent.updated_at -= by;
        }
    }
}

#[async_trait]
impl ReversalJournal for InMemoryReversalJournal {
    async fn open(&self, intent: &ReversalIntent) -> Result<()> {
        let mut intents = self.intents.write().await;
        if intents.contains_key(&intent.id) {
            return Err(AppError::conflict(format!(
                "Reversal intent {} already exists",
                intent.id
            )));
        }
        if intents
            .values()
            .any(|open| open.invoice_id == intent.invoice_id && open.stage.is_open())
        {
            return Err(AppError::conflict(format!(
                "Invoice {} already has a reversal in progress",
                intent.invoice_id
            )));
        }
        intents.insert(intent.id.clone(), intent.clone());
        Ok(())
    }

    async fn advance(
        &self,
        id: &str,
        stage: ReversalStage,
        last_error: Option<&str>,
    ) -> Result<()> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Reversal intent {}", id)))?;

        intent.stage = stage;
        if let Some(error) = last_error {
            intent.last_error = Some(error.to_string());
        }
        intent.updated_at = Utc::now();
        Ok(())
    }

    async fn rebase(&self, id: &str, expected_version: i64, full: bool) -> Result<()> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("Reversal intent {}", id)))?;

        intent.expected_version = expected_version;
        intent.full = full;
        intent.updated_at = Utc::now();
        Ok(())
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalIntent>> {
        let intents = self.intents.read().await;
        let mut matching: Vec<ReversalIntent> = intents
            .values()
            .filter(|intent| intent.invoice_id == invoice_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    async fn find_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<ReversalIntent>> {
        let intents = self.intents.read().await;
        let mut pending: Vec<ReversalIntent> = intents
            .values()
            .filter(|intent| intent.stage.is_open() && intent.updated_at < cutoff)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }
}
