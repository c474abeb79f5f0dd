//! Prometheus Metrics Module
//!
//! Exposes trader metrics in Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Ticks**: Ticks consumed per instrument
//! - **Purchases**: Purchases sent and confirmed per instrument
//! - **Pipelines**: Active pipelines and how they finished
//! - **Errors**: Venue errors and failed notification deliveries
//!
//! # Integration
//!
//! Metrics are served at `/metrics` on `TRADER_METRICS_PORT`. With the port
//! unset the recording functions are no-ops.

use std::net::{Ipv4Addr, SocketAddr};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::domain::instrument::Instrument;

/// Errors starting the exporter.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The exporter could not be installed.
    #[error("failed to install Prometheus exporter: {0}")]
    Installation(String),
}

/// Install the Prometheus recorder with an HTTP listener on `port`.
///
/// Does nothing when `port` is 0. Must be called from within a Tokio
/// runtime.
///
/// # Errors
///
/// Returns an error if the exporter fails to start (e.g., port already in
/// use) or a recorder is already installed.
pub fn init_metrics(port: u16) -> Result<(), MetricsError> {
    if port == 0 {
        tracing::debug!("Metrics exporter disabled");
        return Ok(());
    }

    let listen_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|e| MetricsError::Installation(e.to_string()))?;

    register_metrics();
    tracing::info!(addr = %listen_addr, "Prometheus metrics exporter started");
    Ok(())
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "window_trader_ticks_total",
        "Ticks consumed for the pipeline's own instrument"
    );
    describe_counter!(
        "window_trader_purchases_sent_total",
        "Purchase requests sent to the venue"
    );
    describe_counter!(
        "window_trader_purchases_confirmed_total",
        "Purchases acknowledged by the venue"
    );
    describe_counter!(
        "window_trader_venue_errors_total",
        "Error messages received from the venue"
    );
    describe_counter!(
        "window_trader_pipelines_finished_total",
        "Pipelines finished, by outcome"
    );
    describe_gauge!(
        "window_trader_active_pipelines",
        "Pipelines currently running"
    );
    describe_counter!(
        "window_trader_notification_failures_total",
        "Notifications that could not be delivered"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a tick consumed by a pipeline.
pub fn record_tick(instrument: &Instrument) {
    counter!(
        "window_trader_ticks_total",
        "instrument" => instrument.as_str().to_string()
    )
    .increment(1);
}

/// Record a purchase request sent.
pub fn record_purchase_sent(instrument: &Instrument) {
    counter!(
        "window_trader_purchases_sent_total",
        "instrument" => instrument.as_str().to_string()
    )
    .increment(1);
}

/// Record a purchase acknowledgment.
pub fn record_purchase_confirmed(instrument: &Instrument) {
    counter!(
        "window_trader_purchases_confirmed_total",
        "instrument" => instrument.as_str().to_string()
    )
    .increment(1);
}

/// Record a venue error message.
pub fn record_venue_error(instrument: &Instrument) {
    counter!(
        "window_trader_venue_errors_total",
        "instrument" => instrument.as_str().to_string()
    )
    .increment(1);
}

/// Record a pipeline starting.
pub fn pipeline_started() {
    gauge!("window_trader_active_pipelines").increment(1.0);
}

/// Record a pipeline finishing with `outcome`.
pub fn pipeline_finished(outcome: &'static str) {
    gauge!("window_trader_active_pipelines").decrement(1.0);
    counter!(
        "window_trader_pipelines_finished_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a failed notification delivery.
pub fn record_notification_failure() {
    counter!("window_trader_notification_failures_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================
