//! Trade Ledger
//!
//! Owns the sticky "already traded" flag of every instrument for the life of
//! the process, plus whether a pipeline is currently running for it.
//!
//! # Design
//!
//! Pipelines never see the ledger itself. They receive a [`TradeSlot`] that
//! is scoped to exactly one instrument, so a pipeline can only ever flip its
//! own flag. Claiming a slot marks the instrument as in flight; dropping the
//! slot releases the claim. The traded flag is never released.
//!
//! ```text
//!             claim()                       try_mark_traded()
//!  idle ─────────────────► in flight ───────────────────────────► traded
//!    ▲                        │                                  (sticky)
//!    └──────── drop(slot) ────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::instrument::Instrument;

/// Flags for a single instrument.
#[derive(Debug, Default)]
struct LedgerEntry {
    traded: AtomicBool,
    in_flight: AtomicBool,
}

/// Why a slot could not be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimRejection {
    /// The instrument has already traded.
    AlreadyTraded,
    /// Another pipeline for the instrument is still running.
    InFlight,
}

/// Process-wide record of which instruments have traded.
#[derive(Debug, Default)]
pub struct TradeLedger {
    entries: RwLock<HashMap<Instrument, Arc<LedgerEntry>>>,
}

impl TradeLedger {
    /// Create a ledger with an untraded entry for each instrument.
    #[must_use]
    pub fn new<'a>(instruments: impl IntoIterator<Item = &'a Instrument>) -> Self {
        let entries = instruments
            .into_iter()
            .map(|i| (i.clone(), Arc::new(LedgerEntry::default())))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Get the entry for `instrument`, inserting an untraded one if absent.
    fn entry(&self, instrument: &Instrument) -> Arc<LedgerEntry> {
        if let Some(entry) = self.entries.read().get(instrument) {
            return Arc::clone(entry);
        }
        Arc::clone(self.entries.write().entry(instrument.clone()).or_default())
    }

    /// Claim the slot for `instrument` so a pipeline may run for it.
    ///
    /// # Errors
    ///
    /// Returns the reason when the instrument has traded or already has a
    /// pipeline in flight.
    pub fn claim(&self, instrument: &Instrument) -> Result<TradeSlot, ClaimRejection> {
        let entry = self.entry(instrument);

        if entry.traded.load(Ordering::SeqCst) {
            return Err(ClaimRejection::AlreadyTraded);
        }
        if entry
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ClaimRejection::InFlight);
        }

        Ok(TradeSlot {
            instrument: instrument.clone(),
            entry,
        })
    }

    /// Whether `instrument` has traded.
    #[must_use]
    pub fn is_traded(&self, instrument: &Instrument) -> bool {
        self.entries
            .read()
            .get(instrument)
            .is_some_and(|e| e.traded.load(Ordering::SeqCst))
    }

    /// Whether `instrument` currently has a pipeline in flight.
    #[must_use]
    pub fn is_in_flight(&self, instrument: &Instrument) -> bool {
        self.entries
            .read()
            .get(instrument)
            .is_some_and(|e| e.in_flight.load(Ordering::SeqCst))
    }

    /// Instruments from `candidates` that have not traded yet, in order.
    #[must_use]
    pub fn untraded(&self, candidates: &[Instrument]) -> Vec<Instrument> {
        candidates
            .iter()
            .filter(|i| !self.is_traded(i))
            .cloned()
            .collect()
    }

    /// Number of instruments that have traded.
    #[must_use]
    pub fn traded_count(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| e.traded.load(Ordering::SeqCst))
            .count()
    }
}

/// Exclusive handle to one instrument's ledger entry.
///
/// Held by the pipeline running for that instrument. Dropping it clears the
/// in-flight mark; the traded flag is unaffected.
#[derive(Debug)]
pub struct TradeSlot {
    instrument: Instrument,
    entry: Arc<LedgerEntry>,
}

impl TradeSlot {
    /// Instrument this slot belongs to.
    #[must_use]
    pub const fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Whether the instrument has traded.
    #[must_use]
    pub fn is_traded(&self) -> bool {
        self.entry.traded.load(Ordering::SeqCst)
    }

    /// Atomically set the traded flag.
    ///
    /// Returns `true` only for the call that flipped it from false to true.
    pub fn try_mark_traded(&self) -> bool {
        self.entry
            .traded
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Drop for TradeSlot {
    fn drop(&mut self) {
        self.entry.in_flight.store(false, Ordering::SeqCst);
    }
}
