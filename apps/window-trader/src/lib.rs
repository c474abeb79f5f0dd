#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::cast_possible_wrap
    )
)]

//! Window Trader - Windowed Tick Collection and One-Shot Purchases
//!
//! Streams ticks for a fixed set of synthetic indices from the venue's
//! WebSocket API, waits out an observation window per instrument and then
//! buys exactly one contract per instrument for the life of the process.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Instruments, orders and trading state
//!   - `instrument`: Instrument symbols and tick observations
//!   - `order`: Contract terms and purchase orders
//!   - `ledger`: Sticky per-instrument traded flags
//!   - `tracker`: Per-instrument window state machine
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Venue session and notifier interfaces
//!   - `pipeline`: One connection, one instrument, at most one purchase
//!   - `supervisor`: First pass, then periodic relaunch of untraded instruments
//!   - `notifications`: Lifecycle events and ordered background delivery
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `venue`: WebSocket session, codec and heartbeat
//!   - `notify`: Telegram and log notifiers
//!   - `config`: Environment configuration
//!   - `telemetry`, `metrics`: Observability
//!
//! # Data Flow
//!
//! ```text
//!                 ┌────────────┐  claim   ┌─────────────┐
//!                 │ Supervisor │─────────►│ TradeLedger │
//!                 └─────┬──────┘          └──────▲──────┘
//!                       │ spawn per instrument   │ CAS traded
//!                       ▼                        │
//! Venue WS ◄──────► TickPipeline ──► InstrumentTracker
//!                       │
//!                       └──► NotificationHub ──► Telegram
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Trading state with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::instrument::{DEFAULT_INSTRUMENTS, Instrument, TickObservation};
pub use domain::ledger::{ClaimRejection, TradeLedger, TradeSlot};
pub use domain::order::{ContractTerms, PurchaseOrder};
pub use domain::tracker::{InstrumentTracker, TickDecision, TrackerState};

// Application services
pub use application::notifications::{LifecycleEvent, NotificationHandle, NotificationHub};
pub use application::pipeline::{PipelineError, PipelineOutcome, PipelineSettings, TickPipeline};
pub use application::ports::{
    Notifier, NotifyError, SessionError, VenueConnector, VenueMessage, VenueRequest, VenueSession,
};
pub use application::supervisor::{BatchReport, Supervisor, SupervisorSettings};

// Infrastructure config
pub use infrastructure::config::{ConfigError, Credentials, TraderConfig};

// Adapters
pub use infrastructure::notify::{LogNotifier, TelegramConfig, TelegramNotifier};
pub use infrastructure::venue::WsConnector;

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
