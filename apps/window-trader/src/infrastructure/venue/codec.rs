//! Venue Codec
//!
//! JSON encoding of [`VenueRequest`]s and decoding of venue frames into
//! [`VenueMessage`]s.
//!
//! A frame with an `error` object decodes to [`VenueMessage::Error`]
//! whatever its `msg_type`. Frames with a `msg_type` the trader does not
//! consume decode to `Ok(None)`.

use serde::Deserialize;

use super::messages::{
    AuthorizePayload, AuthorizeRequest, BuyPayload, BuyRequest, EchoedBuyRequest, ErrorPayload,
    PingRequest, TickPayload, TicksRequest, id_to_string,
};
use crate::application::ports::{VenueMessage, VenueRequest};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// A recognized message is missing its body.
    #[error("`{0}` message without a `{0}` body")]
    MissingBody(&'static str),
}

/// Raw inbound frame. Bodies are kept as JSON values and decoded once the
/// discriminant is known.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    msg_type: Option<String>,
    #[serde(default)]
    error: Option<ErrorPayload>,
    #[serde(default)]
    authorize: Option<serde_json::Value>,
    #[serde(default)]
    tick: Option<serde_json::Value>,
    #[serde(default)]
    buy: Option<serde_json::Value>,
    #[serde(default)]
    echo_req: Option<serde_json::Value>,
}

/// JSON codec for the venue WebSocket API.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one text frame.
    ///
    /// Returns `Ok(None)` for well-formed frames the trader does not consume.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object or a recognized
    /// message has a malformed body.
    pub fn decode(&self, text: &str) -> Result<Option<VenueMessage>, CodecError> {
        let envelope: Envelope = serde_json::from_str(text)?;

        if let Some(error) = envelope.error {
            return Ok(Some(VenueMessage::Error {
                code: error.code,
                message: error.message,
            }));
        }

        let message = match envelope.msg_type.as_deref() {
            Some("authorize") => {
                let body: AuthorizePayload = body(envelope.authorize, "authorize")?;
                VenueMessage::Authorized {
                    login_id: body.loginid,
                }
            }
            Some("tick") => {
                let body: TickPayload = body(envelope.tick, "tick")?;
                VenueMessage::Tick {
                    instrument: body.symbol,
                    quote: body.quote,
                    epoch: body.epoch,
                }
            }
            Some("buy") => {
                let body: BuyPayload = body(envelope.buy, "buy")?;
                let echo: EchoedBuyRequest = match envelope.echo_req {
                    Some(value) => serde_json::from_value(value).unwrap_or_default(),
                    None => EchoedBuyRequest::default(),
                };
                VenueMessage::BuyAck {
                    transaction_id: id_to_string(&body.transaction_id),
                    contract_id: body.contract_id.as_ref().map(id_to_string),
                    instrument: echo.parameters.symbol,
                }
            }
            Some("ping") => VenueMessage::Pong,
            other => {
                tracing::trace!(msg_type = ?other, "Ignoring unconsumed message type");
                return Ok(None);
            }
        };

        Ok(Some(message))
    }

    /// Encode a request as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self, request: &VenueRequest) -> Result<String, CodecError> {
        let json = match request {
            VenueRequest::Authorize { token } => serde_json::to_string(&AuthorizeRequest {
                authorize: token.clone(),
            })?,
            VenueRequest::Ping => serde_json::to_string(&PingRequest::default())?,
            VenueRequest::SubscribeTicks(instrument) => {
                serde_json::to_string(&TicksRequest::subscribe(instrument.clone()))?
            }
            VenueRequest::Buy(order) => serde_json::to_string(&BuyRequest::with_parameters(
                order.parameters().clone(),
            ))?,
        };
        Ok(json)
    }
}

fn body<T: serde::de::DeserializeOwned>(
    value: Option<serde_json::Value>,
    name: &'static str,
) -> Result<T, CodecError> {
    let value = value.ok_or(CodecError::MissingBody(name))?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::domain::instrument::Instrument;
    use crate::domain::order::{ContractTerms, PurchaseOrder};

    fn decode(text: &str) -> Option<VenueMessage> {
        JsonCodec::new().decode(text).unwrap()
    }

    #[test]
    fn decodes_tick() {
        let msg = decode(
            r#"{"msg_type":"tick","echo_req":{"ticks":"R_10"},"tick":{"symbol":"R_10","quote":6423.58,"epoch":1700000000,"id":"abc"}}"#,
        );
        assert_eq!(
            msg,
            Some(VenueMessage::Tick {
                instrument: Instrument::new("R_10"),
                quote: 6423.58,
                epoch: Some(1_700_000_000),
            })
        );
    }

    #[test]
    fn decodes_authorize() {
        let msg = decode(r#"{"msg_type":"authorize","authorize":{"loginid":"VRTC123","balance":10000}}"#);
        assert_eq!(
            msg,
            Some(VenueMessage::Authorized {
                login_id: Some("VRTC123".to_string())
            })
        );
    }

    #[test]
    fn decodes_buy_ack_with_echoed_symbol() {
        let msg = decode(
            r#"{"msg_type":"buy","buy":{"transaction_id":123456,"contract_id":789,"buy_price":0.35},"echo_req":{"buy":1,"parameters":{"symbol":"R_50","amount":0.35}}}"#,
        );
        assert_eq!(
            msg,
            Some(VenueMessage::BuyAck {
                transaction_id: "123456".to_string(),
                contract_id: Some("789".to_string()),
                instrument: Some(Instrument::new("R_50")),
            })
        );
    }

    #[test]
    fn buy_ack_without_echo_has_no_instrument() {
        let msg = decode(r#"{"msg_type":"buy","buy":{"transaction_id":"T1"}}"#);
        assert_eq!(
            msg,
            Some(VenueMessage::BuyAck {
                transaction_id: "T1".to_string(),
                contract_id: None,
                instrument: None,
            })
        );
    }

    #[test_case(r#"{"msg_type":"authorize","error":{"code":"InvalidToken","message":"The token is invalid."}}"#, "The token is invalid." ; "authorize error")]
    #[test_case(r#"{"msg_type":"tick","error":{"code":"MarketIsClosed","message":"This market is presently closed."}}"#, "This market is presently closed." ; "tick error")]
    #[test_case(r#"{"error":{"message":"Unrecognised request."}}"#, "Unrecognised request." ; "error without msg_type")]
    fn error_payload_wins_over_msg_type(text: &str, expected: &str) {
        match decode(text) {
            Some(VenueMessage::Error { message, .. }) => assert_eq!(message, expected),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test_case(r#"{"msg_type":"proposal","proposal":{"id":"x"}}"# ; "unconsumed type")]
    #[test_case(r#"{"msg_type":"time","time":1700000000}"# ; "time")]
    #[test_case(r#"{"echo_req":{}}"# ; "no type")]
    fn unconsumed_frames_decode_to_none(text: &str) {
        assert_eq!(decode(text), None);
    }

    #[test]
    fn decodes_pong() {
        assert_eq!(
            decode(r#"{"msg_type":"ping","ping":"pong"}"#),
            Some(VenueMessage::Pong)
        );
    }

    #[test]
    fn malformed_frames_are_errors() {
        let codec = JsonCodec::new();
        assert!(codec.decode("not json").is_err());
        assert!(codec.decode(r#"{"msg_type":"tick"}"#).is_err());
        assert!(codec
            .decode(r#"{"msg_type":"tick","tick":{"symbol":"R_10"}}"#)
            .is_err());
    }

    #[test]
    fn encodes_requests() {
        let codec = JsonCodec::new();
        let encode = |request: VenueRequest| -> serde_json::Value {
            serde_json::from_str(&codec.encode(&request).unwrap()).unwrap()
        };

        assert_eq!(
            encode(VenueRequest::Authorize {
                token: "tok".to_string()
            }),
            json!({"authorize": "tok"})
        );
        assert_eq!(encode(VenueRequest::Ping), json!({"ping": 1}));
        assert_eq!(
            encode(VenueRequest::SubscribeTicks(Instrument::new("R_75"))),
            json!({"ticks": "R_75", "subscribe": 1})
        );

        let order = PurchaseOrder::new(Instrument::new("R_75"), &ContractTerms::default());
        assert_eq!(
            encode(VenueRequest::Buy(order)),
            json!({
                "buy": 1,
                "parameters": {
                    "amount": 0.35,
                    "basis": "stake",
                    "contract_type": "CALL",
                    "currency": "USD",
                    "duration": 5,
                    "duration_unit": "m",
                    "symbol": "R_75"
                }
            })
        );
    }
}
