//! Supervisor
//!
//! Schedules tick pipelines across the configured instruments.
//!
//! # Schedule
//!
//! ```text
//! t=0      notify "waiting"
//!          ├─ first pass: one pipeline per instrument, awaited as a batch
//!          └─ sleep(initial_wait) ─► notify "continuing"
//! then     loop { batch(untraded, not in flight); sleep(poll_interval) }
//! ```
//!
//! The supervisor never looks at pipeline errors. Each cycle re-derives the
//! instruments to launch from the ledger's sticky flags.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use super::notifications::{LifecycleEvent, NotificationHandle};
use super::pipeline::{PipelineOutcome, PipelineSettings, TickPipeline};
use super::ports::VenueConnector;
use crate::domain::instrument::Instrument;
use crate::domain::ledger::{ClaimRejection, TradeLedger};

/// Supervisor timing.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    /// Process-wide wait before continuous monitoring begins.
    pub initial_wait: Duration,
    /// Pause between monitoring cycles.
    pub poll_interval: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(3600),
            poll_interval: Duration::from_secs(60),
        }
    }
}

/// Summary of one batch of pipelines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Pipelines started.
    pub launched: usize,
    /// Pipelines that sent a purchase.
    pub purchased: usize,
    /// Pipelines that ended on a venue error or transport failure.
    pub failed: usize,
    /// Instruments skipped because they traded or were still in flight.
    pub skipped: usize,
}

/// Top-level scheduler across instruments.
pub struct Supervisor {
    instruments: Vec<Instrument>,
    ledger: Arc<TradeLedger>,
    connector: Arc<dyn VenueConnector>,
    notifications: NotificationHandle,
    pipeline_settings: Arc<PipelineSettings>,
    settings: SupervisorSettings,
}

impl Supervisor {
    /// Create a supervisor over `instruments`.
    #[must_use]
    pub fn new(
        instruments: Vec<Instrument>,
        ledger: Arc<TradeLedger>,
        connector: Arc<dyn VenueConnector>,
        notifications: NotificationHandle,
        pipeline_settings: PipelineSettings,
        settings: SupervisorSettings,
    ) -> Self {
        Self {
            instruments,
            ledger,
            connector,
            notifications,
            pipeline_settings: Arc::new(pipeline_settings),
            settings,
        }
    }

    /// The trade ledger.
    #[must_use]
    pub const fn ledger(&self) -> &Arc<TradeLedger> {
        &self.ledger
    }

    /// Run the full schedule until `cancel` fires.
    ///
    /// Pipelines already running when cancellation arrives are left to finish
    /// on their own.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            instruments = self.instruments.len(),
            initial_wait_secs = self.settings.initial_wait.as_secs(),
            poll_interval_secs = self.settings.poll_interval.as_secs(),
            "Supervisor starting"
        );

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Supervisor cancelled during first pass");
                return;
            }
            _ = self.run_first_pass() => {}
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Supervisor cancelled");
                    return;
                }
                report = self.run_cycle() => {
                    tracing::info!(
                        launched = report.launched,
                        purchased = report.purchased,
                        failed = report.failed,
                        skipped = report.skipped,
                        traded = self.ledger.traded_count(),
                        "Monitoring cycle finished"
                    );
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Supervisor cancelled");
                    return;
                }
                () = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }

    /// Launch every instrument and wait out the initial window.
    ///
    /// Returns once both the batch has finished and `initial_wait` has
    /// elapsed. The "continuing" notice goes out when the wait elapses,
    /// whether or not the batch is still running.
    pub async fn run_first_pass(&self) -> BatchReport {
        self.notifications
            .publish(LifecycleEvent::AwaitingInitialWindow);

        let initial_wait = async {
            tokio::time::sleep(self.settings.initial_wait).await;
            self.notifications
                .publish(LifecycleEvent::InitialWindowElapsed);
        };

        let (report, ()) = tokio::join!(self.run_batch(&self.instruments), initial_wait);
        tracing::info!(
            launched = report.launched,
            purchased = report.purchased,
            failed = report.failed,
            "First pass finished"
        );
        report
    }

    /// One monitoring cycle: launch pipelines for untraded instruments.
    pub async fn run_cycle(&self) -> BatchReport {
        let pending = self.ledger.untraded(&self.instruments);
        if pending.is_empty() {
            tracing::debug!("All instruments traded, nothing to launch");
            return BatchReport {
                skipped: self.instruments.len(),
                ..BatchReport::default()
            };
        }
        let mut report = self.run_batch(&pending).await;
        report.skipped += self.instruments.len() - pending.len();
        report
    }

    /// Launch one pipeline per claimable instrument and wait for all of them.
    async fn run_batch(&self, instruments: &[Instrument]) -> BatchReport {
        let mut report = BatchReport::default();
        let mut batch = Vec::with_capacity(instruments.len());

        for instrument in instruments {
            let slot = match self.ledger.claim(instrument) {
                Ok(slot) => slot,
                Err(ClaimRejection::AlreadyTraded) => {
                    tracing::debug!(instrument = %instrument, "Already traded, not launching");
                    report.skipped += 1;
                    continue;
                }
                Err(ClaimRejection::InFlight) => {
                    tracing::info!(instrument = %instrument, "Previous pipeline still running, skipping");
                    report.skipped += 1;
                    continue;
                }
            };

            let pipeline = TickPipeline::new(
                slot,
                Arc::clone(&self.connector),
                self.notifications.clone(),
                Arc::clone(&self.pipeline_settings),
            );
            // Detached: dropping the handle leaves the pipeline running.
            batch.push(tokio::spawn(pipeline.run()));
            report.launched += 1;
        }

        for joined in join_all(batch).await {
            match joined {
                Ok(Ok(PipelineOutcome::Purchased { .. })) => report.purchased += 1,
                Ok(Ok(PipelineOutcome::AlreadyTraded)) => {}
                Ok(Ok(PipelineOutcome::VenueRejected { .. }) | Err(_)) => report.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Pipeline task panicked or was aborted");
                    report.failed += 1;
                }
            }
        }

        report
    }
}
