//! Venue WebSocket Session
//!
//! One WebSocket connection per pipeline. The read half stays with the
//! session; writes go through a bounded channel to a writer task so the
//! heartbeat and the pipeline can share the connection.
//!
//! # Stream URL
//!
//! `wss://ws.binaryws.com/websockets/v3?app_id=<id>`
//!
//! # Lifecycle
//!
//! ```text
//! open ─► writer task ─┬─► heartbeat task (after start_heartbeat)
//!                      │
//! close / drop ─► cancel ─► writer flushes queued frames, sends Close
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::codec::JsonCodec;
use super::heartbeat::{HeartbeatConfig, HeartbeatManager};
use crate::application::ports::{
    SessionError, VenueConnector, VenueMessage, VenueRequest, VenueSession,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default venue endpoint, without the `app_id` query.
pub const DEFAULT_VENUE_URL: &str = "wss://ws.binaryws.com/websockets/v3";

const OUTBOUND_CAPACITY: usize = 32;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Connector
// =============================================================================

/// Opens WebSocket sessions to the venue.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Connector for a fully-formed URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Connector for `base` identified by the registered application id.
    #[must_use]
    pub fn for_app(base: &str, app_id: u32) -> Self {
        Self::new(format!("{base}?app_id={app_id}"))
    }

    /// Target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl VenueConnector for WsConnector {
    async fn open(&self) -> Result<Box<dyn VenueSession>, SessionError> {
        tracing::debug!(url = %self.url, "Connecting to venue");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        Ok(Box::new(WsSession::start(ws_stream)))
    }
}

// =============================================================================
// Session
// =============================================================================

/// A live venue connection.
pub struct WsSession {
    read: SplitStream<WsStream>,
    outbound: mpsc::Sender<Message>,
    codec: JsonCodec,
    cancel: CancellationToken,
    writer: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl WsSession {
    fn start(ws_stream: WsStream) -> Self {
        let (write, read) = ws_stream.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let cancel = CancellationToken::new();

        let writer = tokio::spawn(run_writer(write, outbound_rx, cancel.clone()));

        Self {
            read,
            outbound: outbound_tx,
            codec: JsonCodec::new(),
            cancel,
            writer: Some(writer),
            heartbeat: None,
        }
    }
}

#[async_trait]
impl VenueSession for WsSession {
    async fn send(&mut self, request: VenueRequest) -> Result<(), SessionError> {
        let json = self
            .codec
            .encode(&request)
            .map_err(|e| SessionError::Encode(e.to_string()))?;

        self.outbound
            .send(Message::Text(json.into()))
            .await
            .map_err(|_| SessionError::ConnectionClosed)
    }

    async fn next_message(&mut self) -> Result<Option<VenueMessage>, SessionError> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => match self.codec.decode(text.as_str()) {
                    Ok(Some(message)) => return Ok(Some(message)),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping malformed venue frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(frame = ?frame, "Venue sent close frame");
                    return Ok(None);
                }
                // tungstenite answers pings on its own
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(SessionError::Transport(e.to_string())),
                None => {
                    tracing::info!("Venue stream ended");
                    return Ok(None);
                }
            }
        }
    }

    fn start_heartbeat(&mut self, interval: Duration) {
        if self.heartbeat.is_some() {
            return;
        }
        let manager = HeartbeatManager::new(
            HeartbeatConfig::new(interval),
            self.outbound.clone(),
            self.cancel.child_token(),
        );
        self.heartbeat = Some(tokio::spawn(manager.run()));
    }

    async fn close(&mut self) {
        self.cancel.cancel();

        if let Some(heartbeat) = self.heartbeat.take()
            && tokio::time::timeout(CLOSE_TIMEOUT, heartbeat).await.is_err()
        {
            tracing::warn!("Timed out stopping venue heartbeat");
        }
        if let Some(writer) = self.writer.take()
            && tokio::time::timeout(CLOSE_TIMEOUT, writer).await.is_err()
        {
            tracing::warn!("Timed out closing venue connection");
        }
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Forward queued frames to the socket until cancelled, then flush what is
/// still queued and close the connection.
async fn run_writer(
    mut write: SplitSink<WsStream, Message>,
    mut outbound: mpsc::Receiver<Message>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = write.send(frame).await {
                    tracing::warn!(error = %e, "Venue write failed");
                    return;
                }
            }
        }
    }

    while let Ok(frame) = outbound.try_recv() {
        if write.send(frame).await.is_err() {
            return;
        }
    }
    if let Err(e) = write.close().await {
        tracing::debug!(error = %e, "Error closing venue connection");
    }
}
