//! Configuration Module
//!
//! Configuration loading for the trader.

mod settings;

pub use settings::{ConfigError, Credentials, TimingSettings, TraderConfig};
