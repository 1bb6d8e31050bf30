use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};

use crate::core::deadline::bounded;
use crate::core::{AppError, Result};
use crate::modules::payments::models::{PaymentRecord, PaymentStatus, StatusUpdate};

/// Storage port for payment attempt records
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a new record; checkout ids are unique
    async fn create(&self, record: &PaymentRecord) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentRecord>>;

    async fn find_by_checkout_id(&self, checkout_request_id: &str)
        -> Result<Option<PaymentRecord>>;

    /// Compare-and-set status change.
    ///
    /// Applies `update` only while the record is still in `from`; returns
    /// whether a row changed.
    async fn transition(
        &self,
        checkout_request_id: &str,
        from: PaymentStatus,
        update: &StatusUpdate,
    ) -> Result<bool>;

    /// Move every completed record of an invoice to reversed; returns the count
    async fn reverse_completed_by_invoice(&self, invoice_id: &str) -> Result<u64>;
}

/// MySQL-backed payment record repository
pub struct MySqlPaymentRepository {
    pool: MySqlPool,
    timeout: Duration,
}

impl MySqlPaymentRepository {
    pub fn new(pool: MySqlPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

const PAYMENT_COLUMNS: &str = "id, checkout_request_id, merchant_request_id, amount, phone, \
     invoice_id, order_id, status, mpesa_receipt_number, transaction_date, created_at, updated_at";

#[async_trait]
impl PaymentRepository for MySqlPaymentRepository {
    async fn create(&self, record: &PaymentRecord) -> Result<()> {
        bounded(self.timeout, "payment_records.create", async {
            sqlx::query(
                r#"
                INSERT INTO payment_records (
                    id, checkout_request_id, merchant_request_id, amount, phone,
                    invoice_id, order_id, status, mpesa_receipt_number, transaction_date,
                    created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&record.checkout_request_id)
            .bind(&record.merchant_request_id)
            .bind(record.amount)
            .bind(&record.phone)
            .bind(&record.invoice_id)
            .bind(&record.order_id)
            .bind(record.status.to_string())
            .bind(&record.mpesa_receipt_number)
            .bind(&record.transaction_date)
            .bind(record.created_at)
            .bind(record.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::conflict(format!(
                            "Payment record for checkout {} already exists",
                            record.checkout_request_id
                        ));
                    }
                }
                AppError::Database(e)
            })?;

            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentRecord>> {
        bounded(self.timeout, "payment_records.find_by_id", async {
            let row = sqlx::query_as::<_, PaymentRow>(&format!(
                "SELECT {} FROM payment_records WHERE id = ?",
                PAYMENT_COLUMNS
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(PaymentRow::into_record).transpose()
        })
        .await
    }

    async fn find_by_checkout_id(
        &self,
        checkout_request_id: &str,
    ) -> Result<Option<PaymentRecord>> {
        bounded(self.timeout, "payment_records.find_by_checkout_id", async {
            let row = sqlx::query_as::<_, PaymentRow>(&format!(
                "SELECT {} FROM payment_records WHERE checkout_request_id = ?",
                PAYMENT_COLUMNS
            ))
            .bind(checkout_request_id)
            .fetch_optional(&self.pool)
            .await?;

            row.map(PaymentRow::into_record).transpose()
        })
        .await
    }

    async fn transition(
        &self,
        checkout_request_id: &str,
        from: PaymentStatus,
        update: &StatusUpdate,
    ) -> Result<bool> {
        bounded(self.timeout, "payment_records.transition", async {
            let result = sqlx::query(
                r#"
                UPDATE payment_records
                SET status = ?,
                    mpesa_receipt_number = COALESCE(?, mpesa_receipt_number),
                    transaction_date = COALESCE(?, transaction_date),
                    updated_at = ?
                WHERE checkout_request_id = ? AND status = ?
                "#,
            )
            .bind(update.status.to_string())
            .bind(&update.receipt_number)
            .bind(&update.transaction_date)
            .bind(Utc::now())
            .bind(checkout_request_id)
            .bind(from.to_string())
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() == 1)
        })
        .await
    }

    async fn reverse_completed_by_invoice(&self, invoice_id: &str) -> Result<u64> {
        bounded(self.timeout, "payment_records.reverse_by_invoice", async {
            let result = sqlx::query(
                r#"
                UPDATE payment_records
                SET status = ?, updated_at = ?
                WHERE invoice_id = ? AND status = ?
                "#,
            )
            .bind(PaymentStatus::Reversed.to_string())
            .bind(Utc::now())
            .bind(invoice_id)
            .bind(PaymentStatus::Completed.to_string())
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected())
        })
        .await
    }
}

// Internal row struct for database mapping
#[derive(FromRow)]
struct PaymentRow {
    id: String,
    checkout_request_id: String,
    merchant_request_id: String,
    amount: Decimal,
    phone: String,
    invoice_id: String,
    order_id: String,
    status: String,
    mpesa_receipt_number: Option<String>,
    transaction_date: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    fn into_record(self) -> Result<PaymentRecord> {
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(AppError::Internal)?;

        Ok(PaymentRecord {
            id: self.id,
            checkout_request_id: self.checkout_request_id,
            merchant_request_id: self.merchant_request_id,
            amount: self.amount,
            phone: self.phone,
            invoice_id: self.invoice_id,
            order_id: self.order_id,
            status,
            mpesa_receipt_number: self.mpesa_receipt_number,
            transaction_date: self.transaction_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
