use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};

use crate::core::deadline::bounded;
use crate::core::{AppError, Result};
use crate::modules::reversals::models::{ReversalIntent, ReversalStage};

/// Durable log of in-flight reversals
///
/// At most one intent per invoice may be open at a time.
#[async_trait]
pub trait ReversalJournal: Send + Sync {
    /// `Conflict` while another intent for the same invoice is still open
    async fn open(&self, intent: &ReversalIntent) -> Result<()>;

    /// Move an intent to `stage`, recording the error that caused it if any.
    /// `NotFound` for an unknown id.
    async fn advance(&self, id: &str, stage: ReversalStage, last_error: Option<&str>)
        -> Result<()>;

    /// Point the ledger step at a newer invoice version, and narrow a full
    /// reversal to a partial one when `full` is false
    async fn rebase(&self, id: &str, expected_version: i64, full: bool) -> Result<()>;

    /// Every intent of an invoice, oldest first
    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalIntent>>;

    /// Open intents not touched since `cutoff`, oldest first
    async fn find_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<ReversalIntent>>;
}

/// MySQL-backed reversal journal
pub struct MySqlReversalJournal {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlReversalJournal {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

const INTENT_COLUMNS: &str = "id, invoice_id, amount, date, phone, admin_id, reason, \
     full_reversal, use_gateway, expected_version, stage, last_error, created_at, updated_at";

#[async_trait]
impl ReversalJournal for MySqlReversalJournal {
    async fn open(&self, intent: &ReversalIntent) -> Result<()> {
        bounded(self.timeout, "reversal_intents.open", async {
            sqlx::query(
                r#"
                INSERT INTO reversal_intents (
                    id, invoice_id, amount, date, phone, admin_id, reason,
                    full_reversal, use_gateway, expected_version, stage, last_error,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&intent.id)
            .bind(&intent.invoice_id)
            .bind(intent.amount)
            .bind(intent.date)
            .bind(&intent.phone)
            .bind(&intent.admin_id)
            .bind(&intent.reason)
            .bind(intent.full)
            .bind(intent.use_gateway)
            .bind(intent.expected_version)
            .bind(intent.stage.as_str())
            .bind(&intent.last_error)
            .bind(intent.created_at)
            .bind(intent.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::conflict(format!(
                            "Invoice {} already has a reversal in progress",
                            intent.invoice_id
                        ));
                    }
                }
                AppError::Database(e)
            })?;

            Ok(())
        })
        .await
    }

    async fn advance(
        &self,
        id: &str,
        stage: ReversalStage,
        last_error: Option<&str>,
    ) -> Result<()> {
        bounded(self.timeout, "reversal_intents.advance", async {
            let result = sqlx::query(
                r#"
                UPDATE reversal_intents
                SET stage = ?, last_error = COALESCE(?, last_error), updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(stage.as_str())
            .bind(last_error)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::not_found(format!("Reversal intent {}", id)));
            }

            Ok(())
        })
        .await
    }

    async fn rebase(&self, id: &str, expected_version: i64, full: bool) -> Result<()> {
        bounded(self.timeout, "reversal_intents.rebase", async {
            let result = sqlx::query(
                r#"
                UPDATE reversal_intents
                SET expected_version = ?, full_reversal = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(expected_version)
            .bind(full)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::not_found(format!("Reversal intent {}", id)));
            }

            Ok(())
        })
        .await
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalIntent>> {
        bounded(self.timeout, "reversal_intents.find_by_invoice", async {
            let rows = sqlx::query_as::<_, IntentRow>(&format!(
                "SELECT {} FROM reversal_intents WHERE invoice_id = ? ORDER BY created_at",
                INTENT_COLUMNS
            ))
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(IntentRow::into_intent).collect()
        })
        .await
    }

    async fn find_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<ReversalIntent>> {
        bounded(self.timeout, "reversal_intents.find_pending", async {
            let rows = sqlx::query_as::<_, IntentRow>(&format!(
                "SELECT {} FROM reversal_intents \
                 WHERE stage NOT IN ('completed', 'aborted') AND updated_at < ? \
                 ORDER BY created_at",
                INTENT_COLUMNS
            ))
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

            rows.into_iter().map(IntentRow::into_intent).collect()
        })
        .await
    }
}

#[derive(FromRow)]
struct IntentRow {
    id: String,
    invoice_id: String,
    amount: Decimal,
    date: NaiveDate,
    phone: Option<String>,
    admin_id: String,
    reason: String,
    full_reversal: bool,
    use_gateway: bool,
    expected_version: i64,
    stage: String,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IntentRow {
    fn into_intent(self) -> Result<ReversalIntent> {
        let stage = self
            .stage
            .parse::<ReversalStage>()
            .map_err(AppError::Internal)?;

        Ok(ReversalIntent {
            id: self.id,
            invoice_id: self.invoice_id,
            amount: self.amount,
            date: self.date,
            phone: self.phone,
            admin_id: self.admin_id,
            reason: self.reason,
            full: self.full_reversal,
            use_gateway: self.use_gateway,
            expected_version: self.expected_version,
            stage,
            last_error: self.last_error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
