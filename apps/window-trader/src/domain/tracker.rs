//! Instrument Tracker
//!
//! Collects ticks for one instrument and decides when its purchase fires.
//!
//! # State Machine
//!
//! ```text
//!  Collecting ──(window elapsed, flag flipped)──► TradeTriggered ──(buy ack)──► Done
//!      │
//!      └──────(window elapsed, flag already set)────────────────────────────► Done
//! ```
//!
//! Transitions only move forward. Ticks received outside `Collecting` are
//! dropped without being recorded.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::instrument::{Instrument, TickObservation};
use super::ledger::TradeSlot;

/// Lifecycle of a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Accumulating ticks until the window elapses.
    Collecting,
    /// Purchase has been decided; waiting for the venue acknowledgment.
    TradeTriggered,
    /// Nothing left to do for this instrument.
    Done,
}

/// Outcome of feeding one tick to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Window still open; keep collecting.
    Continue,
    /// Window elapsed and this tracker won the traded flag: send the purchase.
    FirePurchase,
    /// Window elapsed but the instrument had already traded elsewhere.
    AlreadyTraded,
    /// Tracker is no longer collecting; tick discarded.
    Ignored,
}

/// Per-instrument tick collection and trade trigger.
#[derive(Debug)]
pub struct InstrumentTracker {
    slot: TradeSlot,
    window: Duration,
    window_start: DateTime<Utc>,
    observations: Vec<TickObservation>,
    state: TrackerState,
}

impl InstrumentTracker {
    /// Start collecting for the slot's instrument with the window opening at
    /// `started_at`.
    #[must_use]
    pub const fn new(slot: TradeSlot, window: Duration, started_at: DateTime<Utc>) -> Self {
        Self {
            slot,
            window,
            window_start: started_at,
            observations: Vec::new(),
            state: TrackerState::Collecting,
        }
    }

    /// Instrument being tracked.
    #[must_use]
    pub const fn instrument(&self) -> &Instrument {
        self.slot.instrument()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    /// When the window opened.
    #[must_use]
    pub const fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    /// Number of ticks recorded.
    #[must_use]
    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    /// Most recent quote recorded.
    #[must_use]
    pub fn last_quote(&self) -> Option<f64> {
        self.observations.last().map(|o| o.quote)
    }

    /// Whether `timestamp` is at or past the end of the window.
    fn window_elapsed(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp
            .signed_duration_since(self.window_start)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.window)
    }

    /// Record a tick and decide whether the purchase fires.
    pub fn on_tick(&mut self, quote: f64, timestamp: DateTime<Utc>) -> TickDecision {
        if self.state != TrackerState::Collecting {
            return TickDecision::Ignored;
        }

        self.observations.push(TickObservation {
            instrument: self.slot.instrument().clone(),
            quote,
            received_at: timestamp,
        });

        if !self.window_elapsed(timestamp) {
            return TickDecision::Continue;
        }

        if self.slot.try_mark_traded() {
            self.state = TrackerState::TradeTriggered;
            TickDecision::FirePurchase
        } else {
            self.state = TrackerState::Done;
            TickDecision::AlreadyTraded
        }
    }

    /// Record the venue's purchase acknowledgment.
    ///
    /// Returns `true` if this moved the tracker from `TradeTriggered` to
    /// `Done`; repeated or unexpected acknowledgments return `false`.
    pub fn on_purchase_ack(&mut self) -> bool {
        if self.state == TrackerState::TradeTriggered {
            self.state = TrackerState::Done;
            true
        } else {
            false
        }
    }
}
