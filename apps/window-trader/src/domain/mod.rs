//! Domain Layer - Instruments, trade bookkeeping and the tick window state machine.
//!
//! Nothing in this layer performs I/O. Timestamps are passed in by callers so
//! the window arithmetic stays deterministic under test.

/// Instrument identifiers and tick observations.
pub mod instrument;

/// Sticky per-instrument traded flags and in-flight claims.
pub mod ledger;

/// Purchase orders and contract parameters.
pub mod order;

/// Per-instrument tick collection and trade trigger.
pub mod tracker;
