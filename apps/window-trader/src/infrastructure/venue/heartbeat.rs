//! Heartbeat Manager
//!
//! Keeps a venue connection alive by queueing a `{"ping": 1}` frame on the
//! session's outbound channel at a fixed interval. The first ping goes out
//! one interval after start. Pong replies are not tracked; a dead
//! connection surfaces through the read side instead.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::messages::PingRequest;

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between ping messages.
    pub ping_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with a custom interval.
    #[must_use]
    pub const fn new(ping_interval: Duration) -> Self {
        Self { ping_interval }
    }
}

/// Periodic ping sender for one connection.
///
/// Send failures end the loop quietly: the outbound channel only closes
/// when the session is going away.
pub struct HeartbeatManager {
    config: HeartbeatConfig,
    outbound: mpsc::Sender<Message>,
    cancel: CancellationToken,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    #[must_use]
    pub const fn new(
        config: HeartbeatConfig,
        outbound: mpsc::Sender<Message>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            outbound,
            cancel,
        }
    }

    /// Run the heartbeat loop until cancelled or the outbound channel closes.
    pub async fn run(self) {
        let Ok(frame) = serde_json::to_string(&PingRequest::default()) else {
            return;
        };

        let period = self.config.ping_interval;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Heartbeat manager cancelled");
                    break;
                }
                _ = interval.tick() => {
                    tracing::trace!("Sending ping");
                    let ping = Message::Text(frame.clone().into());
                    // The queue may be full behind a stalled writer.
                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::debug!("Heartbeat manager cancelled while queueing ping");
                            break;
                        }
                        sent = self.outbound.send(ping) => {
                            if sent.is_err() {
                                tracing::debug!("Outbound channel closed, stopping heartbeat");
                                break;
                            }
                        }
                    }
                }
            }
        }
    }
}
