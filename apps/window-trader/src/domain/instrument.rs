//! Instrument Types
//!
//! Identifiers for the synthetic indices the trader watches, and the tick
//! observations collected for them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Synthetic indices watched when no instrument list is configured.
pub const DEFAULT_INSTRUMENTS: &[&str] = &[
    "R_10", "R_25", "R_50", "R_75", "R_100", "1HZ10V", "1HZ25V", "1HZ50V", "1HZ75V", "1HZ100V",
];

/// A tradable symbol on the venue (e.g. `R_10`).
///
/// Opaque to the trader: the venue owns the meaning of the identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(String);

impl Instrument {
    /// Create an instrument from its venue symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// The venue symbol.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The default instrument set.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        DEFAULT_INSTRUMENTS.iter().map(|s| Self::new(*s)).collect()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instrument {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

impl From<String> for Instrument {
    fn from(symbol: String) -> Self {
        Self(symbol)
    }
}

impl PartialEq<str> for Instrument {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// One price observation for an instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct TickObservation {
    /// Instrument the quote belongs to.
    pub instrument: Instrument,
    /// Quoted price.
    pub quote: f64,
    /// Local arrival time.
    pub received_at: DateTime<Utc>,
}
