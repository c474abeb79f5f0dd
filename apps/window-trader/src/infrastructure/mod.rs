//! Infrastructure Layer
//!
//! Adapters behind the application ports, plus process-wide concerns.
//!
//! - `venue`: WebSocket session to the trading venue
//! - `notify`: Telegram and log notifiers
//! - `config`: environment configuration
//! - `telemetry`: logging and trace export
//! - `metrics`: Prometheus metrics

pub mod config;
pub mod metrics;
pub mod notify;
pub mod telemetry;
pub mod venue;
