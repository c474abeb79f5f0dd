//! Venue WebSocket Message Types
//!
//! Wire format types for the venue's JSON WebSocket API. Only the fields the
//! trader consumes are modeled; everything else is ignored on decode.
//!
//! # Outbound
//!
//! ```json
//! {"authorize": "<token>"}
//! {"ping": 1}
//! {"ticks": "R_10", "subscribe": 1}
//! {"buy": 1, "parameters": {"amount": 0.35, "basis": "stake", ...}}
//! ```
//!
//! # Inbound
//!
//! Every response carries a `msg_type` discriminant and echoes the request
//! in `echo_req`. Failures carry an `error` object alongside.
//!
//! ```json
//! {"msg_type": "tick", "tick": {"symbol": "R_10", "quote": 6423.58, "epoch": 1700000000}}
//! {"msg_type": "buy", "buy": {"transaction_id": 123, "contract_id": 456}, "echo_req": {...}}
//! {"msg_type": "authorize", "error": {"code": "InvalidToken", "message": "The token is invalid."}}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::instrument::Instrument;
use crate::domain::order::ContractParameters;

// =============================================================================
// Outbound
// =============================================================================

/// `{"authorize": token}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizeRequest {
    /// API token.
    pub authorize: String,
}

/// `{"ping": 1}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PingRequest {
    /// Always 1.
    pub ping: u8,
}

impl Default for PingRequest {
    fn default() -> Self {
        Self { ping: 1 }
    }
}

/// `{"ticks": symbol, "subscribe": 1}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicksRequest {
    /// Instrument to stream.
    pub ticks: Instrument,
    /// 1 to keep streaming after the first tick.
    pub subscribe: u8,
}

impl TicksRequest {
    /// Streaming subscription for `instrument`.
    #[must_use]
    pub const fn subscribe(instrument: Instrument) -> Self {
        Self {
            ticks: instrument,
            subscribe: 1,
        }
    }
}

/// `{"buy": 1, "parameters": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuyRequest {
    /// 1 to buy using `parameters` rather than a proposal id.
    pub buy: u8,
    /// Contract parameters.
    pub parameters: ContractParameters,
}

impl BuyRequest {
    /// Buy a contract with the given parameters.
    #[must_use]
    pub const fn with_parameters(parameters: ContractParameters) -> Self {
        Self { buy: 1, parameters }
    }
}

// =============================================================================
// Inbound
// =============================================================================

/// Error payload attached to any response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorPayload {
    /// Machine readable code, e.g. `InvalidToken`.
    #[serde(default)]
    pub code: Option<String>,
    /// Human readable text.
    pub message: String,
}

/// `authorize` response body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizePayload {
    /// Account login id.
    #[serde(default)]
    pub loginid: Option<String>,
}

/// `tick` response body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TickPayload {
    /// Instrument symbol.
    pub symbol: Instrument,
    /// Quoted price.
    pub quote: f64,
    /// Venue timestamp, epoch seconds.
    #[serde(default)]
    pub epoch: Option<i64>,
}

/// `buy` response body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BuyPayload {
    /// Transaction id (numeric on the wire, occasionally a string).
    pub transaction_id: serde_json::Value,
    /// Contract id.
    #[serde(default)]
    pub contract_id: Option<serde_json::Value>,
}

/// Parameters echoed back in `echo_req` of a `buy` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EchoedParameters {
    /// Instrument the contract was bought on.
    #[serde(default)]
    pub symbol: Option<Instrument>,
}

/// `echo_req` of a `buy` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EchoedBuyRequest {
    /// Echoed contract parameters.
    #[serde(default)]
    pub parameters: EchoedParameters,
}

/// Render a JSON scalar id as a plain string.
#[must_use]
pub fn id_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
