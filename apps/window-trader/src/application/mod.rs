//! Application Layer - Use cases and port definitions.
//!
//! Wires the domain state machine to the venue and the notification channel
//! through the port traits, without knowing which adapters sit behind them.

/// Lifecycle events and the asynchronous notification hub.
pub mod notifications;

/// Per-instrument tick pipeline.
pub mod pipeline;

/// Port interfaces for the venue connection and the notification channel.
pub mod ports;

/// Scheduling of pipelines across instruments.
pub mod supervisor;
