//! Venue WebSocket Adapter
//!
//! Implements the venue session ports over the venue's JSON WebSocket API.

pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod session;

pub use codec::{CodecError, JsonCodec};
pub use heartbeat::{HeartbeatConfig, HeartbeatManager};
pub use session::{DEFAULT_VENUE_URL, WsConnector, WsSession};
