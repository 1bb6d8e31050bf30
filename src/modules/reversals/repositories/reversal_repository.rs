use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};

use crate::core::deadline::bounded;
use crate::core::Result;
use crate::modules::reversals::models::ReversalRecord;

/// Append-only audit log of reversals
#[async_trait]
pub trait ReversalRepository: Send + Sync {
    /// Insert an audit entry; appending an id that already exists is a no-op
    async fn append(&self, record: &ReversalRecord) -> Result<()>;

    /// Oldest first
    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalRecord>>;
}

/// MySQL-backed reversal audit log
pub struct MySqlReversalRepository {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlReversalRepository {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

const REVERSAL_COLUMNS: &str = "id, invoice_id, amount, date, phone, admin_id, reason, created_at";

#[async_trait]
impl ReversalRepository for MySqlReversalRepository {
    async fn append(&self, record: &ReversalRecord) -> Result<()> {
        bounded(self.timeout, "reversal_records.append", async {
            sqlx::query(
                r#"
                INSERT IGNORE INTO reversal_records (
                    id, invoice_id, amount, date, phone, admin_id, reason, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&record.invoice_id)
            .bind(record.amount)
            .bind(record.date)
            .bind(&record.phone)
            .bind(&record.admin_id)
            .bind(&record.reason)
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;

            Ok(())
        })
        .await
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalRecord>> {
        bounded(self.timeout, "reversal_records.find_by_invoice", async {
            let rows = sqlx::query_as::<_, ReversalRow>(&format!(
                "SELECT {} FROM reversal_records WHERE invoice_id = ? ORDER BY created_at",
                REVERSAL_COLUMNS
            ))
            .bind(invoice_id)
            .fetch_all(&self.pool)
            .await?;

            Ok(rows.into_iter().map(ReversalRow::into_record).collect())
        })
        .await
    }
}

#[derive(FromRow)]
struct ReversalRow {
    id: String,
    invoice_id: String,
    amount: Decimal,
    date: NaiveDate,
    phone: Option<String>,
    admin_id: String,
    reason: String,
    created_at: DateTime<Utc>,
}

impl ReversalRow {
    fn into_record(self) -> ReversalRecord {
        ReversalRecord {
            id: self.id,
            invoice_id: self.invoice_id,
            amount: self.amount,
            date: self.date,
            phone: self.phone,
            admin_id: self.admin_id,
            reason: self.reason,
            created_at: self.created_at,
        }
    }
}
