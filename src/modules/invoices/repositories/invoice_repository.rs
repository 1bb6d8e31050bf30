// Invoice ledger storage
//
// Every ledger mutation runs inside one transaction holding the invoice row
// lock (`SELECT ... FOR UPDATE`), checks the optional expected version, and
// writes the new state with `version + 1`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, MySqlPool};

use crate::core::deadline::bounded;
use crate::core::{AppError, Result};
use crate::modules::invoices::models::{Invoice, InvoiceType, LedgerEntry, LedgerOutcome};

/// Storage port for invoices
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new invoice; a second invoice for the same order is a conflict
    async fn create(&self, invoice: &Invoice) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Invoice>>;

    /// Newest first
    async fn list(
        &self,
        invoice_type: Option<InvoiceType>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Invoice>>;

    async fn count(&self, invoice_type: Option<InvoiceType>) -> Result<u64>;

    /// Apply one ledger entry atomically.
    ///
    /// Fails with `NotFound` for an unknown invoice and `Conflict` when
    /// `expected_version` is set and no longer matches; neither mutates state.
    async fn apply_entry(
        &self,
        id: &str,
        entry: &LedgerEntry,
        expected_version: Option<i64>,
    ) -> Result<LedgerOutcome>;
}

/// Shared version check used by every implementation
pub(crate) fn check_version(invoice: &Invoice, expected_version: Option<i64>) -> Result<()> {
    match expected_version {
        Some(expected) if expected != invoice.version => Err(AppError::conflict(format!(
            "Invoice {} changed concurrently (expected version {}, found {})",
            invoice.id, expected, invoice.version
        ))),
        _ => Ok(()),
    }
}

/// MySQL-backed invoice repository
pub struct MySqlInvoiceRepository {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlInvoiceRepository {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

const INVOICE_COLUMNS: &str = "id, order_id, invoice_amount, paid_amount, paid_on, \
     type AS invoice_type, tax_amount, version, created_at, updated_at";

#[async_trait]
impl InvoiceRepository for MySqlInvoiceRepository {
    async fn create(&self, invoice: &Invoice) -> Result<()> {
        bounded(self.timeout, "invoices.create", async {
            sqlx::query(
                r#"
                INSERT INTO invoices (
                    id, order_id, invoice_amount, paid_amount, paid_on, type,
                    tax_amount, version, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&invoice.id)
            .bind(&invoice.order_id)
            .bind(invoice.invoice_amount)
            .bind(invoice.paid_amount)
            .bind(Json(&invoice.paid_on))
            .bind(invoice.invoice_type.to_string())
            .bind(invoice.tax_amount)
            .bind(invoice.version)
            .bind(invoice.created_at)
            .bind(invoice.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::conflict(format!(
                            "Invoice already exists for order {}",
                            invoice.order_id
                        ));
                    }
                }
                AppError::Database(e)
            })?;

            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        bounded(self.timeout, "invoices.find_by_id", async {
            let row = sqlx::query_as::<_, InvoiceRow>(&format!(
                "SELECT {} FROM invoices WHERE id = ?",
                INVOICE_COLUMNS
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(InvoiceRow::into_invoice).transpose()
        })
        .await
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Invoice>> {
        bounded(self.timeout, "invoices.find_by_order_id", async {
            let row = sqlx::query_as::<_, InvoiceRow>(&format!(
                "SELECT {} FROM invoices WHERE order_id = ?",
                INVOICE_COLUMNS
            ))
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(InvoiceRow::into_invoice).transpose()
        })
        .await
    }

    async fn list(
        &self,
        invoice_type: Option<InvoiceType>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Invoice>> {
        bounded(self.timeout, "invoices.list", async {
            let rows = match invoice_type {
                Some(kind) => {
                    sqlx::query_as::<_, InvoiceRow>(&format!(
                        "SELECT {} FROM invoices WHERE type = ? \
                         ORDER BY created_at DESC LIMIT ? OFFSET ?",
                        INVOICE_COLUMNS
                    ))
                    .bind(kind.to_string())
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
                }
                None => {
                    sqlx::query_as::<_, InvoiceRow>(&format!(
                        "SELECT {} FROM invoices ORDER BY created_at DESC LIMIT ? OFFSET ?",
                        INVOICE_COLUMNS
                    ))
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?
                }
            };

            rows.into_iter().map(InvoiceRow::into_invoice).collect()
        })
        .await
    }

    async fn count(&self, invoice_type: Option<InvoiceType>) -> Result<u64> {
        bounded(self.timeout, "invoices.count", async {
            let total: i64 = match invoice_type {
                Some(kind) => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE type = ?")
                        .bind(kind.to_string())
                        .fetch_one(&self.pool)
                        .await?
                }
                None => {
                    sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
                        .fetch_one(&self.pool)
                        .await?
                }
            };

            Ok(total.max(0) as u64)
        })
        .await
    }

    async fn apply_entry(
        &self,
        id: &str,
        entry: &LedgerEntry,
        expected_version: Option<i64>,
    ) -> Result<LedgerOutcome> {
        bounded(self.timeout, "invoices.apply_entry", async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query_as::<_, InvoiceRow>(&format!(
                "SELECT {} FROM invoices WHERE id = ? FOR UPDATE",
                INVOICE_COLUMNS
            ))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            // Dropping `tx` on an early return rolls back and releases the lock
            let mut invoice = row
                .ok_or_else(|| AppError::not_found(format!("Invoice {}", id)))?
                .into_invoice()?;
            check_version(&invoice, expected_version)?;

            let applied = entry.apply(&mut invoice)?;
            invoice.version += 1;
            invoice.updated_at = Utc::now();

            sqlx::query(
                r#"
                UPDATE invoices
                SET paid_amount = ?, paid_on = ?, type = ?, version = ?, updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(invoice.paid_amount)
            .bind(Json(&invoice.paid_on))
            .bind(invoice.invoice_type.to_string())
            .bind(invoice.version)
            .bind(invoice.updated_at)
            .bind(&invoice.id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            tracing::info!(
                invoice_id = %invoice.id,
                entry = entry.kind(),
                applied = %applied,
                paid_amount = %invoice.paid_amount,
                version = invoice.version,
                "Ledger entry applied"
            );

            Ok(LedgerOutcome { invoice, applied })
        })
        .await
    }
}

// Internal row struct for database mapping
#[derive(FromRow)]
struct InvoiceRow {
    id: String,
    order_id: String,
    invoice_amount: Decimal,
    paid_amount: Decimal,
    paid_on: Json<BTreeMap<NaiveDate, Decimal>>,
    invoice_type: String,
    tax_amount: Decimal,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self) -> Result<Invoice> {
        let invoice_type = self
            .invoice_type
            .parse::<InvoiceType>()
            .map_err(AppError::Internal)?;

        Ok(Invoice {
            id: self.id,
            order_id: self.order_id,
            invoice_amount: self.invoice_amount,
            paid_amount: self.paid_amount,
            paid_on: self.paid_on.0,
            invoice_type,
            tax_amount: self.tax_amount,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
