// Reversal orchestration
//
// Stages run in a fixed order: gateway, ledger, payment records, audit. Each
// finished stage is written to the journal before the next one starts, so the
// recovery pass can pick up exactly where an interrupted reversal stopped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::core::{AppError, Result, TimezoneConverter};
use crate::modules::gateways::{MobileMoneyGateway, ReversalRequest};
use crate::modules::invoices::models::{Invoice, LedgerEntry};
use crate::modules::invoices::services::{require_ledger_date, InvoiceService};
use crate::modules::payments::services::{normalize_phone, PaymentService};
use crate::modules::reversals::models::{
    ReversalIntent, ReversalPlan, ReversalRecord, ReversalStage, ReverseInvoiceRequest,
    ReverseInvoiceResponse,
};
use crate::modules::reversals::repositories::{ReversalJournal, ReversalRepository};

/// Outcome of one recovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub examined: usize,
    pub completed: usize,
    pub aborted: usize,

    /// Hit a transient failure; retried on the next pass
    pub stalled: usize,
}

/// Ledger retries after the gateway has already moved funds
const LEDGER_REBASE_ATTEMPTS: u32 = 3;

/// Errors that will not go away by retrying the same step
fn is_permanent(error: &AppError) -> bool {
    matches!(
        error,
        AppError::Conflict(_) | AppError::NotFound(_) | AppError::Validation(_)
    )
}

pub struct ReversalService {
    invoice_service: Arc<InvoiceService>,
    payment_service: Arc<PaymentService>,
    reversal_repo: Arc<dyn ReversalRepository>,
    journal: Arc<dyn ReversalJournal>,
    gateway: Option<Arc<dyn MobileMoneyGateway>>,
}

impl ReversalService {
    pub fn new(
        invoice_service: Arc<InvoiceService>,
        payment_service: Arc<PaymentService>,
        reversal_repo: Arc<dyn ReversalRepository>,
        journal: Arc<dyn ReversalJournal>,
        gateway: Option<Arc<dyn MobileMoneyGateway>>,
    ) -> Self {
        Self {
            invoice_service,
            payment_service,
            reversal_repo,
            journal,
            gateway,
        }
    }

    /// Reverse collected funds on a payable invoice.
    ///
    /// A missing or non-positive amount reverses everything paid. Amounts above
    /// the paid balance are clamped to it and reverse the whole invoice. A
    /// gateway failure aborts before the ledger is touched. Only one reversal
    /// per invoice runs at a time; a second one gets `Conflict`.
    pub async fn reverse_invoice(
        &self,
        admin_id: &str,
        invoice_id: &str,
        request: ReverseInvoiceRequest,
    ) -> Result<ReverseInvoiceResponse> {
        let invoice = self.invoice_service.get_invoice(invoice_id).await?;
        if !invoice.is_payable() {
            return Err(AppError::validation(
                "Only payable invoices can be reversed",
            ));
        }

        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("Reversal reason is required"));
        }

        let requested = request
            .amount
            .filter(|amount| *amount > Decimal::ZERO)
            .unwrap_or(invoice.paid_amount);
        let amount = requested.min(invoice.paid_amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::validation("No paid amount available to reverse"));
        }

        let date = match request.date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => require_ledger_date(date)?,
            _ => TimezoneConverter::ledger_today(Utc::now()),
        };

        let phone = match request.phone.as_deref().map(str::trim) {
            Some(phone) if !phone.is_empty() => Some(normalize_phone(phone)?),
            _ => None,
        };
        if request.use_mpesa && phone.is_none() {
            return Err(AppError::validation(
                "Phone number is required for an M-Pesa reversal",
            ));
        }

        let mut intent = ReversalIntent::open(ReversalPlan {
            invoice_id: invoice.id.clone(),
            amount,
            date,
            phone,
            admin_id: admin_id.to_string(),
            reason: reason.to_string(),
            full: requested >= invoice.paid_amount,
            use_gateway: request.use_mpesa,
            expected_version: invoice.version,
        });
        self.journal.open(&intent).await?;

        tracing::info!(
            reversal_id = %intent.id,
            invoice_id = %intent.invoice_id,
            amount = %intent.amount,
            full = intent.full,
            use_gateway = intent.use_gateway,
            admin_id = %intent.admin_id,
            "Reversal opened"
        );

        if intent.use_gateway {
            if let Err(e) = self.reverse_at_gateway(&intent).await {
                tracing::warn!(
                    reversal_id = %intent.id,
                    invoice_id = %intent.invoice_id,
                    error = %e,
                    "Gateway reversal failed"
                );
                self.abort(&mut intent, &e).await;
                return Err(e);
            }
        }
        self.mark(&mut intent, ReversalStage::GatewayConfirmed, None)
            .await;

        let invoice = match self.apply_ledger(&mut intent).await {
            Ok(invoice) => invoice,
            Err(e) => {
                if intent.use_gateway {
                    tracing::error!(
                        reversal_id = %intent.id,
                        invoice_id = %intent.invoice_id,
                        error = %e,
                        "Gateway reversed funds but the ledger step failed"
                    );
                }
                self.abort(&mut intent, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = self.reverse_payments(&mut intent).await {
            tracing::error!(
                reversal_id = %intent.id,
                invoice_id = %intent.invoice_id,
                error = %e,
                "Payment records not reversed; left for recovery"
            );
            return Ok(ReverseInvoiceResponse {
                invoice,
                reversal: intent.to_record(),
            });
        }

        let reversal = match self.write_audit(&mut intent).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    reversal_id = %intent.id,
                    invoice_id = %intent.invoice_id,
                    error = %e,
                    "Reversal audit not written; left for recovery"
                );
                intent.to_record()
            }
        };

        Ok(ReverseInvoiceResponse { invoice, reversal })
    }

    pub async fn reversals_for_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalRecord>> {
        self.reversal_repo.find_by_invoice(invoice_id).await
    }

    /// Journal entries for an invoice, including open and aborted ones
    pub async fn intents_for_invoice(&self, invoice_id: &str) -> Result<Vec<ReversalIntent>> {
        self.invoice_service.get_invoice(invoice_id).await?;
        self.journal.find_by_invoice(invoice_id).await
    }

    /// Resume every open intent untouched for at least `grace`
    pub async fn recover_pending(&self, grace: Duration) -> Result<RecoveryReport> {
        let grace = chrono::Duration::from_std(grace)
            .map_err(|e| AppError::internal(format!("Invalid recovery grace: {}", e)))?;
        let pending = self.journal.find_pending(Utc::now() - grace).await?;

        let mut report = RecoveryReport {
            examined: pending.len(),
            ..RecoveryReport::default()
        };

        for mut intent in pending {
            match self.resume(&mut intent).await {
                Ok(ReversalStage::Completed) => report.completed += 1,
                Ok(_) => report.aborted += 1,
                Err(e) => {
                    tracing::warn!(
                        reversal_id = %intent.id,
                        stage = %intent.stage,
                        error = %e,
                        "Reversal recovery stalled"
                    );
                    let stage = intent.stage;
                    self.mark(&mut intent, stage, Some(&e.to_string())).await;
                    report.stalled += 1;
                }
            }
        }

        Ok(report)
    }

    /// Drive one intent to a final stage
    async fn resume(&self, intent: &mut ReversalIntent) -> Result<ReversalStage> {
        loop {
            match intent.stage {
                ReversalStage::Opened => {
                    // The gateway call may or may not have gone out
                    let error = if intent.use_gateway {
                        "Interrupted before the gateway outcome was recorded; check the gateway manually"
                    } else {
                        "Interrupted before the ledger step"
                    };
                    tracing::error!(
                        reversal_id = %intent.id,
                        invoice_id = %intent.invoice_id,
                        use_gateway = intent.use_gateway,
                        "{}",
                        error
                    );
                    self.mark(intent, ReversalStage::Aborted, Some(error)).await;
                }
                ReversalStage::GatewayConfirmed => {
                    if let Err(e) = self.apply_ledger(intent).await {
                        if !is_permanent(&e) {
                            return Err(e);
                        }
                        tracing::error!(
                            reversal_id = %intent.id,
                            invoice_id = %intent.invoice_id,
                            error = %e,
                            "Recovered reversal could not apply to the ledger"
                        );
                        self.abort(intent, &e).await;
                    }
                }
                ReversalStage::LedgerApplied => self.reverse_payments(intent).await?,
                ReversalStage::PaymentsReversed => {
                    self.write_audit(intent).await?;
                }
                ReversalStage::Completed | ReversalStage::Aborted => {
                    tracing::info!(
                        reversal_id = %intent.id,
                        stage = %intent.stage,
                        "Reversal recovered"
                    );
                    return Ok(intent.stage);
                }
            }
        }
    }

    async fn reverse_at_gateway(&self, intent: &ReversalIntent) -> Result<()> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or_else(|| AppError::configuration("M-Pesa client not configured"))?;
        let phone = intent.phone.clone().ok_or_else(|| {
            AppError::validation("Phone number is required for an M-Pesa reversal")
        })?;

        gateway
            .initiate_reversal(ReversalRequest {
                phone,
                amount: intent.amount,
                invoice_id: intent.invoice_id.clone(),
            })
            .await
    }

    /// Gateway reversals retry a version conflict against the fresh invoice
    async fn apply_ledger(&self, intent: &mut ReversalIntent) -> Result<Invoice> {
        let mut attempts = 0;
        loop {
            let entry = if intent.full {
                LedgerEntry::ReverseAll
            } else {
                LedgerEntry::ReverseAmount {
                    amount: intent.amount,
                    date: intent.date,
                }
            };

            match self
                .invoice_service
                .apply(&intent.invoice_id, entry, Some(intent.expected_version))
                .await
            {
                Ok(outcome) => {
                    self.mark(intent, ReversalStage::LedgerApplied, None).await;
                    return Ok(outcome.invoice);
                }
                Err(AppError::Conflict(message))
                    if intent.use_gateway && attempts < LEDGER_REBASE_ATTEMPTS =>
                {
                    attempts += 1;
                    tracing::warn!(
                        reversal_id = %intent.id,
                        invoice_id = %intent.invoice_id,
                        attempt = attempts,
                        conflict = %message,
                        "Invoice changed during reversal; rebasing ledger step"
                    );
                    self.rebase(intent).await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Re-read the invoice and aim the ledger step at its current version.
    ///
    /// A full reversal of an invoice that has since collected more than the
    /// gateway returned becomes a partial reversal of the returned amount.
    async fn rebase(&self, intent: &mut ReversalIntent) -> Result<()> {
        let invoice = self.invoice_service.get_invoice(&intent.invoice_id).await?;
        if !invoice.is_payable() || invoice.paid_amount <= Decimal::ZERO {
            return Err(AppError::conflict(format!(
                "Invoice {} no longer holds the reversed funds",
                intent.invoice_id
            )));
        }

        let full = intent.full && invoice.paid_amount <= intent.amount;
        if let Err(e) = self
            .journal
            .rebase(&intent.id, invoice.version, full)
            .await
        {
            tracing::error!(
                reversal_id = %intent.id,
                version = invoice.version,
                error = %e,
                "Failed to record reversal rebase"
            );
        }
        intent.expected_version = invoice.version;
        intent.full = full;
        Ok(())
    }

    /// Only full reversals touch payment records
    async fn reverse_payments(&self, intent: &mut ReversalIntent) -> Result<()> {
        if intent.full {
            self.payment_service
                .reverse_by_invoice(&intent.invoice_id)
                .await?;
        }

        self.mark(intent, ReversalStage::PaymentsReversed, None)
            .await;
        Ok(())
    }

    async fn write_audit(&self, intent: &mut ReversalIntent) -> Result<ReversalRecord> {
        let record = intent.to_record();
        self.reversal_repo.append(&record).await?;

        self.mark(intent, ReversalStage::Completed, None).await;
        tracing::info!(
            reversal_id = %record.id,
            invoice_id = %record.invoice_id,
            amount = %record.amount,
            "Reversal completed"
        );
        Ok(record)
    }

    async fn abort(&self, intent: &mut ReversalIntent, error: &AppError) {
        self.mark(intent, ReversalStage::Aborted, Some(&error.to_string()))
            .await;
    }

    /// Record progress; a journal failure is logged and the in-memory stage
    /// still advances
    async fn mark(&self, intent: &mut ReversalIntent, stage: ReversalStage, error: Option<&str>) {
        if let Err(e) = self.journal.advance(&intent.id, stage, error).await {
            tracing::error!(
                reversal_id = %intent.id,
                stage = %stage,
                error = %e,
                "Failed to record reversal stage"
            );
        }
        intent.stage = stage;
        if let Some(error) = error {
            intent.last_error = Some(error.to_string());
        }
    }
}
