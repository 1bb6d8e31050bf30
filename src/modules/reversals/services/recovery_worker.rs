use std::sync::Arc;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::reversal_service::{RecoveryReport, ReversalService};
use crate::config::RecoveryConfig;

/// Background job that finishes or abandons interrupted reversals
///
/// Runs on a tokio interval; each tick resumes the journal's open intents that
/// are older than the grace window.
pub struct RecoveryWorker {
    service: Arc<ReversalService>,
    config: RecoveryConfig,
}

impl RecoveryWorker {
    pub fn new(service: Arc<ReversalService>, config: RecoveryConfig) -> Self {
        Self { service, config }
    }

    /// Run forever; spawn this as a tokio task in main.rs
    pub async fn start(self: Arc<Self>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            grace_secs = self.config.grace.as_secs(),
            "Starting reversal recovery worker"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One recovery pass; errors are logged and the next tick tries again
    pub async fn run_once(&self) -> Option<RecoveryReport> {
        match self.service.recover_pending(self.config.grace).await {
            Ok(report) => {
                if report.examined > 0 {
                    info!(
                        examined = report.examined,
                        completed = report.completed,
                        aborted = report.aborted,
                        stalled = report.stalled,
                        "Reversal recovery pass finished"
                    );
                }
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "Reversal recovery pass failed");
                None
            }
        }
    }
}
