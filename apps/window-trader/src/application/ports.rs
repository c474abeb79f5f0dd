//! Port Interfaces
//!
//! Contracts the infrastructure adapters implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `VenueConnector` / `VenueSession`: one authenticated, heartbeated
//!   connection to the trading venue
//! - `Notifier`: delivery of a text message to the external channel

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::instrument::Instrument;
use crate::domain::order::PurchaseOrder;

// =============================================================================
// Venue Messages
// =============================================================================

/// Requests sent to the venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueRequest {
    /// Authorize the connection with an API token.
    Authorize {
        /// API token.
        token: String,
    },
    /// Keep-alive.
    Ping,
    /// Subscribe to the tick feed of an instrument.
    SubscribeTicks(Instrument),
    /// Buy a contract.
    Buy(PurchaseOrder),
}

/// Recognized messages received from the venue.
#[derive(Debug, Clone, PartialEq)]
pub enum VenueMessage {
    /// The venue rejected a request.
    Error {
        /// Venue error code, if provided.
        code: Option<String>,
        /// Human readable error text.
        message: String,
    },
    /// Authorization accepted.
    Authorized {
        /// Account the token belongs to, if provided.
        login_id: Option<String>,
    },
    /// Price tick.
    Tick {
        /// Instrument the quote belongs to.
        instrument: Instrument,
        /// Quoted price.
        quote: f64,
        /// Venue timestamp (epoch seconds), if provided.
        epoch: Option<i64>,
    },
    /// Purchase acknowledgment.
    BuyAck {
        /// Venue transaction identifier.
        transaction_id: String,
        /// Venue contract identifier, if provided.
        contract_id: Option<String>,
        /// Instrument echoed back from the request, if provided.
        instrument: Option<Instrument>,
    },
    /// Reply to a keep-alive.
    Pong,
}

// =============================================================================
// Venue Session
// =============================================================================

/// Errors raised by a venue session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport failed after connecting.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The connection is closed.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Opens sessions to the venue.
#[async_trait]
pub trait VenueConnector: Send + Sync {
    /// Establish a new connection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ConnectionFailed` on transport failure. No retry
    /// is attempted.
    async fn open(&self) -> Result<Box<dyn VenueSession>, SessionError>;
}

/// One live connection to the venue.
///
/// Dropping a session must stop its background activity even when `close`
/// was not awaited.
#[async_trait]
pub trait VenueSession: Send {
    /// Send a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be encoded or the connection is
    /// gone.
    async fn send(&mut self, request: VenueRequest) -> Result<(), SessionError>;

    /// Wait for the next recognized message.
    ///
    /// Unknown and malformed messages are skipped. Returns `Ok(None)` when the
    /// venue closes the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    async fn next_message(&mut self) -> Result<Option<VenueMessage>, SessionError>;

    /// Start sending a keep-alive every `interval` until the session closes.
    ///
    /// Keep-alive failures are absorbed.
    fn start_heartbeat(&mut self, interval: Duration);

    /// Stop background activity and release the transport.
    async fn close(&mut self);

    /// Send the authorization request. The outcome arrives on the message
    /// stream as `Authorized` or `Error`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    async fn authorize(&mut self, token: &str) -> Result<(), SessionError> {
        self.send(VenueRequest::Authorize {
            token: token.to_string(),
        })
        .await
    }
}

// =============================================================================
// Notifier
// =============================================================================

/// Errors delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel answered with a non-success status.
    #[error("notification rejected with status {0}")]
    Status(u16),
}

/// Delivers text messages to the external channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails. Callers treat failures as
    /// non-fatal.
    async fn deliver(&self, text: &str) -> Result<(), NotifyError>;
}
