//! Shared test doubles: a scripted in-memory venue and a recording notifier.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use window_trader::{
    Instrument, NotificationHandle, NotificationHub, Notifier, NotifyError, PipelineSettings,
    SessionError, VenueConnector, VenueMessage, VenueRequest, VenueSession,
};

// =============================================================================
// Scripted Venue
// =============================================================================

/// One step of a scripted connection, replayed after the subscribe request.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver a message.
    Message(VenueMessage),
    /// Wait before the next step.
    Delay(Duration),
    /// The venue closes the stream.
    End,
    /// The transport fails.
    Fail(&'static str),
    /// Nothing more ever arrives.
    Silence,
}

#[derive(Default)]
struct Shared {
    scripts: Mutex<HashMap<Instrument, VecDeque<Vec<Step>>>>,
    requests: Mutex<Vec<VenueRequest>>,
    heartbeats: Mutex<Vec<Duration>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    failing_opens: AtomicUsize,
}

/// In-memory venue. Each connection replays the next script queued for the
/// instrument it subscribes to; with none queued the stream ends at once.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    shared: Arc<Shared>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the script for the next connection subscribing to `instrument`.
    pub fn script(&self, instrument: &str, steps: Vec<Step>) -> &Self {
        self.shared
            .scripts
            .lock()
            .entry(Instrument::new(instrument))
            .or_default()
            .push_back(steps);
        self
    }

    /// Refuse the next `count` connection attempts.
    pub fn fail_next_opens(&self, count: usize) {
        self.shared.failing_opens.store(count, Ordering::SeqCst);
    }

    pub fn as_port(&self) -> Arc<dyn VenueConnector> {
        Arc::new(self.clone())
    }

    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<VenueRequest> {
        self.shared.requests.lock().clone()
    }

    pub fn heartbeats(&self) -> Vec<Duration> {
        self.shared.heartbeats.lock().clone()
    }

    pub fn subscriptions(&self, instrument: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, VenueRequest::SubscribeTicks(i) if i == instrument))
            .count()
    }

    pub fn buys(&self, instrument: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r, VenueRequest::Buy(order) if order.instrument() == instrument))
            .count()
    }
}

#[async_trait]
impl VenueConnector for ScriptedConnector {
    async fn open(&self) -> Result<Box<dyn VenueSession>, SessionError> {
        let refused = self
            .shared
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(SessionError::ConnectionFailed(
                "connection refused".to_string(),
            ));
        }

        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            shared: Arc::clone(&self.shared),
            steps: VecDeque::new(),
        }))
    }
}

struct ScriptedSession {
    shared: Arc<Shared>,
    steps: VecDeque<Step>,
}

#[async_trait]
impl VenueSession for ScriptedSession {
    async fn send(&mut self, request: VenueRequest) -> Result<(), SessionError> {
        if let VenueRequest::SubscribeTicks(instrument) = &request {
            let script = self
                .shared
                .scripts
                .lock()
                .get_mut(instrument)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| vec![Step::End]);
            self.steps = script.into();
        }
        self.shared.requests.lock().push(request);
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<VenueMessage>, SessionError> {
        loop {
            match self.steps.pop_front() {
                Some(Step::Message(message)) => return Ok(Some(message)),
                Some(Step::Delay(delay)) => tokio::time::sleep(delay).await,
                Some(Step::End) | None => return Ok(None),
                Some(Step::Fail(reason)) => return Err(SessionError::Transport(reason.to_string())),
                Some(Step::Silence) => std::future::pending::<()>().await,
            }
        }
    }

    fn start_heartbeat(&mut self, interval: Duration) {
        self.shared.heartbeats.lock().push(interval);
    }

    async fn close(&mut self) {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn tick(instrument: &str, quote: f64) -> Step {
    Step::Message(VenueMessage::Tick {
        instrument: Instrument::new(instrument),
        quote,
        epoch: None,
    })
}

pub fn buy_ack(transaction_id: &str, instrument: &str) -> Step {
    Step::Message(VenueMessage::BuyAck {
        transaction_id: transaction_id.to_string(),
        contract_id: None,
        instrument: Some(Instrument::new(instrument)),
    })
}

pub fn venue_error(message: &str) -> Step {
    Step::Message(VenueMessage::Error {
        code: None,
        message: message.to_string(),
    })
}

pub fn authorized() -> Step {
    Step::Message(VenueMessage::Authorized {
        login_id: Some("VRTC1".to_string()),
    })
}

// =============================================================================
// Recording Notifier
// =============================================================================

/// Collects delivered texts, optionally failing every delivery.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn spawn_hub(&self) -> (NotificationHub, NotificationHandle) {
        NotificationHub::spawn(Arc::new(self.clone()))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, text: &str) -> Result<(), NotifyError> {
        self.messages.lock().push(text.to_string());
        if self.fail {
            return Err(NotifyError::Status(500));
        }
        Ok(())
    }
}

/// Drop the last handle and wait for every queued notification.
pub async fn flush(hub: NotificationHub, handle: NotificationHandle) {
    drop(handle);
    tokio::time::timeout(Duration::from_secs(5), hub.drain())
        .await
        .expect("notification hub should drain");
}

/// Settings that fire on the first tick and close without waiting for an
/// acknowledgment.
pub fn immediate_settings() -> PipelineSettings {
    PipelineSettings::new("test-token")
        .with_window(Duration::ZERO)
        .with_purchase_ack_grace(Duration::ZERO)
}
