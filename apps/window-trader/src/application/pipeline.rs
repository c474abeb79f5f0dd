//! Tick Pipeline
//!
//! Drives one venue session for one instrument, end to end:
//!
//! ```text
//! open ─► authorize ─► heartbeat ─► subscribe ─► collect ticks ─► buy ─► (ack grace) ─► close
//!                                                     │
//!                                                     └─ venue error ─► notify ─► close
//! ```
//!
//! The session is closed on every exit path. Errors never leave the pipeline
//! as anything but its return value; the supervisor decides what to do next
//! from the ledger alone.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::notifications::{LifecycleEvent, NotificationHandle};
use super::ports::{SessionError, VenueConnector, VenueMessage, VenueRequest, VenueSession};
use crate::domain::instrument::Instrument;
use crate::domain::ledger::TradeSlot;
use crate::domain::order::{ContractTerms, PurchaseOrder};
use crate::domain::tracker::{InstrumentTracker, TickDecision};
use crate::infrastructure::metrics;

// =============================================================================
// Settings
// =============================================================================

/// Parameters shared by every pipeline run.
#[derive(Clone)]
pub struct PipelineSettings {
    /// Venue API token.
    pub api_token: String,
    /// Observation window before the purchase fires.
    pub window: Duration,
    /// Keep-alive interval.
    pub heartbeat_interval: Duration,
    /// Maximum silence on the stream before giving up (`None` waits forever).
    pub read_timeout: Option<Duration>,
    /// How long to keep reading for the purchase acknowledgment after the
    /// buy request is sent (`Duration::ZERO` closes immediately).
    pub purchase_ack_grace: Duration,
    /// Contract terms for the purchase.
    pub contract: ContractTerms,
}

impl PipelineSettings {
    /// Settings with the default one hour window, 30 second heartbeat and
    /// 10 second acknowledgment grace.
    #[must_use]
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            window: Duration::from_secs(3600),
            heartbeat_interval: Duration::from_secs(30),
            read_timeout: None,
            purchase_ack_grace: Duration::from_secs(10),
            contract: ContractTerms::default(),
        }
    }

    /// Set the observation window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Set the acknowledgment grace period.
    #[must_use]
    pub fn with_purchase_ack_grace(mut self, grace: Duration) -> Self {
        self.purchase_ack_grace = grace;
        self
    }
}

impl fmt::Debug for PipelineSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineSettings")
            .field("api_token", &"[REDACTED]")
            .field("window", &self.window)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("read_timeout", &self.read_timeout)
            .field("purchase_ack_grace", &self.purchase_ack_grace)
            .field("contract", &self.contract)
            .finish()
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// How a pipeline finished without a transport failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The purchase was sent.
    Purchased {
        /// Transaction id, when the acknowledgment arrived within the grace
        /// period.
        transaction_id: Option<String>,
    },
    /// The window elapsed but the instrument had already traded.
    AlreadyTraded,
    /// The venue reported an error.
    VenueRejected {
        /// Venue error text.
        message: String,
    },
}

impl PipelineOutcome {
    const fn label(&self) -> &'static str {
        match self {
            Self::Purchased { .. } => "purchased",
            Self::AlreadyTraded => "already_traded",
            Self::VenueRejected { .. } => "venue_rejected",
        }
    }
}

/// Transport-level pipeline failures.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The session failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// No message arrived within the read timeout.
    #[error("no message received for {0:?}")]
    Stalled(Duration),

    /// The venue closed the stream.
    #[error("stream ended before the pipeline finished")]
    StreamEnded,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Tick collection and purchase for one instrument over one connection.
pub struct TickPipeline {
    slot: TradeSlot,
    connector: Arc<dyn VenueConnector>,
    notifications: NotificationHandle,
    settings: Arc<PipelineSettings>,
}

impl TickPipeline {
    /// Create a pipeline for the slot's instrument.
    #[must_use]
    pub fn new(
        slot: TradeSlot,
        connector: Arc<dyn VenueConnector>,
        notifications: NotificationHandle,
        settings: Arc<PipelineSettings>,
    ) -> Self {
        Self {
            slot,
            connector,
            notifications,
            settings,
        }
    }

    /// Instrument this pipeline runs for.
    #[must_use]
    pub const fn instrument(&self) -> &Instrument {
        self.slot.instrument()
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established, fails, goes
    /// silent past the read timeout, or is closed by the venue.
    pub async fn run(self) -> Result<PipelineOutcome, PipelineError> {
        let span = tracing::info_span!(
            "pipeline",
            instrument = %self.slot.instrument(),
            run_id = %Uuid::new_v4(),
        );
        tracing::Instrument::instrument(self.run_inner(), span).await
    }

    async fn run_inner(self) -> Result<PipelineOutcome, PipelineError> {
        let Self {
            slot,
            connector,
            notifications,
            settings,
        } = self;

        metrics::pipeline_started();
        tracing::info!("Opening venue connection");

        let result = match connector.open().await {
            Ok(mut session) => {
                let result = drive(slot, session.as_mut(), &notifications, &settings).await;
                session.close().await;
                result
            }
            Err(e) => Err(e.into()),
        };

        match &result {
            Ok(outcome) => {
                tracing::info!(outcome = outcome.label(), "Pipeline finished");
                metrics::pipeline_finished(outcome.label());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Pipeline failed");
                metrics::pipeline_finished("transport_error");
            }
        }

        result
    }
}

/// Authorize, subscribe and consume the stream until a terminal condition.
async fn drive(
    slot: TradeSlot,
    session: &mut dyn VenueSession,
    notifications: &NotificationHandle,
    settings: &PipelineSettings,
) -> Result<PipelineOutcome, PipelineError> {
    let instrument = slot.instrument().clone();

    session.authorize(&settings.api_token).await?;
    session.start_heartbeat(settings.heartbeat_interval);
    session
        .send(VenueRequest::SubscribeTicks(instrument.clone()))
        .await?;
    tracing::info!("Subscribed to tick feed");
    notifications.publish(LifecycleEvent::CollectionStarted {
        instrument: instrument.clone(),
    });

    let mut tracker = InstrumentTracker::new(slot, settings.window, Utc::now());

    loop {
        let Some(message) = next_message(session, settings.read_timeout).await? else {
            return Err(PipelineError::StreamEnded);
        };

        match message {
            VenueMessage::Error { code, message } => {
                tracing::error!(code = ?code, error = %message, "Venue error");
                metrics::record_venue_error(&instrument);
                notifications.publish(LifecycleEvent::VenueError {
                    instrument,
                    message: message.clone(),
                });
                return Ok(PipelineOutcome::VenueRejected { message });
            }
            VenueMessage::Authorized { login_id } => {
                tracing::info!(login_id = ?login_id, "Authorized");
            }
            VenueMessage::Tick {
                instrument: ticked,
                quote,
                ..
            } if ticked == instrument => {
                metrics::record_tick(&instrument);
                let decision = tracker.on_tick(quote, Utc::now());
                tracing::debug!(
                    quote,
                    observations = tracker.observation_count(),
                    "Tick"
                );

                match decision {
                    TickDecision::FirePurchase => {
                        notifications.publish(LifecycleEvent::WindowComplete {
                            instrument: instrument.clone(),
                        });
                        let order = PurchaseOrder::new(instrument.clone(), &settings.contract);
                        tracing::info!(
                            observations = tracker.observation_count(),
                            "Sending purchase request"
                        );
                        session.send(VenueRequest::Buy(order)).await?;
                        metrics::record_purchase_sent(&instrument);

                        let transaction_id = await_purchase_ack(
                            session,
                            &mut tracker,
                            notifications,
                            settings.purchase_ack_grace,
                        )
                        .await;
                        return Ok(PipelineOutcome::Purchased { transaction_id });
                    }
                    TickDecision::AlreadyTraded => {
                        tracing::info!("Window elapsed but instrument already traded");
                        return Ok(PipelineOutcome::AlreadyTraded);
                    }
                    TickDecision::Continue | TickDecision::Ignored => {}
                }
            }
            VenueMessage::Tick {
                instrument: ticked, ..
            } => {
                tracing::trace!(other = %ticked, "Ignoring tick for another instrument");
            }
            VenueMessage::BuyAck { transaction_id, .. } => {
                tracing::warn!(transaction_id = %transaction_id, "Purchase acknowledgment before any purchase");
            }
            VenueMessage::Pong => {
                tracing::trace!("Pong");
            }
        }
    }
}

/// Read the next message, honoring the optional read timeout.
async fn next_message(
    session: &mut dyn VenueSession,
    read_timeout: Option<Duration>,
) -> Result<Option<VenueMessage>, PipelineError> {
    match read_timeout {
        Some(limit) => tokio::time::timeout(limit, session.next_message())
            .await
            .map_err(|_| PipelineError::Stalled(limit))?
            .map_err(Into::into),
        None => Ok(session.next_message().await?),
    }
}

/// Keep reading for up to `grace` so a prompt acknowledgment is confirmed.
///
/// Returns the transaction id if the acknowledgment arrived in time.
async fn await_purchase_ack(
    session: &mut dyn VenueSession,
    tracker: &mut InstrumentTracker,
    notifications: &NotificationHandle,
    grace: Duration,
) -> Option<String> {
    if grace.is_zero() {
        return None;
    }

    let deadline = tokio::time::Instant::now() + grace;
    loop {
        match tokio::time::timeout_at(deadline, session.next_message()).await {
            Ok(Ok(Some(VenueMessage::BuyAck {
                transaction_id,
                instrument,
                ..
            }))) => {
                if !tracker.on_purchase_ack() {
                    continue;
                }
                let instrument = instrument.unwrap_or_else(|| tracker.instrument().clone());
                tracing::info!(transaction_id = %transaction_id, "Purchase confirmed");
                metrics::record_purchase_confirmed(&instrument);
                notifications.publish(LifecycleEvent::PurchaseConfirmed {
                    instrument,
                    transaction_id: transaction_id.clone(),
                });
                return Some(transaction_id);
            }
            Ok(Ok(Some(VenueMessage::Error { message, .. }))) => {
                tracing::error!(error = %message, "Purchase rejected");
                metrics::record_venue_error(tracker.instrument());
                notifications.publish(LifecycleEvent::VenueError {
                    instrument: tracker.instrument().clone(),
                    message,
                });
                return None;
            }
            Ok(Ok(Some(_))) => {}
            Ok(Ok(None)) => {
                tracing::debug!("Stream ended before purchase acknowledgment");
                return None;
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Session failed before purchase acknowledgment");
                return None;
            }
            Err(_) => {
                tracing::info!(
                    grace_secs = grace.as_secs(),
                    "No purchase acknowledgment within grace period"
                );
                return None;
            }
        }
    }
}
