//! Lifecycle Notifications
//!
//! Pipelines and the supervisor publish [`LifecycleEvent`]s through a
//! [`NotificationHandle`]. Publishing never blocks and never fails: events are
//! queued to a single background worker that delivers them in order through
//! the configured [`Notifier`]. Delivery failures are logged, counted and
//! dropped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::ports::Notifier;
use crate::domain::instrument::Instrument;
use crate::infrastructure::metrics;

/// Events surfaced to the notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A pipeline subscribed to an instrument's ticks.
    CollectionStarted {
        /// Instrument being collected.
        instrument: Instrument,
    },
    /// An instrument's observation window elapsed.
    WindowComplete {
        /// Instrument whose window elapsed.
        instrument: Instrument,
    },
    /// The venue acknowledged a purchase.
    PurchaseConfirmed {
        /// Instrument purchased.
        instrument: Instrument,
        /// Venue transaction identifier.
        transaction_id: String,
    },
    /// The venue reported an error on an instrument's connection.
    VenueError {
        /// Instrument whose pipeline failed.
        instrument: Instrument,
        /// Venue error text.
        message: String,
    },
    /// The supervisor is waiting out the first window.
    AwaitingInitialWindow,
    /// The first window elapsed; continuous monitoring begins.
    InitialWindowElapsed,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CollectionStarted { instrument } => {
                write!(f, "🚀 Started collecting ticks for {instrument}")
            }
            Self::WindowComplete { instrument } => {
                write!(f, "⏱ Observation window complete for {instrument}")
            }
            Self::PurchaseConfirmed {
                instrument,
                transaction_id,
            } => write!(f, "✅ Trade purchased for {instrument}. ID: {transaction_id}"),
            Self::VenueError {
                instrument,
                message,
            } => write!(f, "⛔ ERROR on {instrument}: {message}"),
            Self::AwaitingInitialWindow => {
                f.write_str("⏳ Waiting for the first observation window to complete...")
            }
            Self::InitialWindowElapsed => {
                f.write_str("⏳ First observation window complete. Continuous monitoring started.")
            }
        }
    }
}

/// Cheap, cloneable publisher of lifecycle events.
#[derive(Debug, Clone)]
pub struct NotificationHandle {
    tx: mpsc::UnboundedSender<LifecycleEvent>,
}

impl NotificationHandle {
    /// Queue an event for delivery.
    ///
    /// If the hub has shut down the event is dropped.
    pub fn publish(&self, event: LifecycleEvent) {
        tracing::info!(event = %event, "Lifecycle event");
        if self.tx.send(event).is_err() {
            tracing::debug!("Notification hub closed, dropping event");
        }
    }
}

/// Background delivery worker.
#[derive(Debug)]
pub struct NotificationHub {
    worker: JoinHandle<()>,
}

impl NotificationHub {
    /// Spawn the delivery worker and return a publisher for it.
    ///
    /// The worker exits once every handle has been dropped and the queue is
    /// drained.
    #[must_use]
    pub fn spawn(notifier: Arc<dyn Notifier>) -> (Self, NotificationHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver_events(notifier, rx));
        (Self { worker }, NotificationHandle { tx })
    }

    /// Wait for all queued events to be delivered.
    ///
    /// Only returns once every [`NotificationHandle`] has been dropped.
    pub async fn drain(self) {
        if let Err(e) = self.worker.await {
            tracing::warn!(error = %e, "Notification worker terminated abnormally");
        }
    }
}

async fn deliver_events(
    notifier: Arc<dyn Notifier>,
    mut rx: mpsc::UnboundedReceiver<LifecycleEvent>,
) {
    while let Some(event) = rx.recv().await {
        let text = event.to_string();
        if let Err(e) = notifier.deliver(&text).await {
            metrics::record_notification_failure();
            tracing::warn!(error = %e, "Notification delivery failed");
        }
    }
    tracing::debug!("Notification worker stopped");
}
