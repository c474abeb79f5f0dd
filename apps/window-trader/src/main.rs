//! Window Trader Binary
//!
//! Starts the supervisor over the configured instruments.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin window-trader
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_TOKEN`: Venue API token
//! - `APP_ID`: Registered venue application id
//!
//! ## Optional
//! - `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`: Telegram delivery (both or neither)
//! - `TELEGRAM_API_BASE`: Bot API base URL (default: <https://api.telegram.org>)
//! - `VENUE_WS_URL`: Venue WebSocket URL (default: <wss://ws.binaryws.com/websockets/v3>)
//! - `TRADER_INSTRUMENTS`: Comma separated symbols (default: the ten synthetic indices)
//! - `TRADER_WINDOW_SECS`: Observation window (default: 3600)
//! - `TRADER_INITIAL_WAIT_SECS`: Wait before continuous monitoring (default: 3600)
//! - `TRADER_POLL_INTERVAL_SECS`: Monitoring cadence (default: 60)
//! - `TRADER_HEARTBEAT_INTERVAL_SECS`: Ping interval (default: 30)
//! - `TRADER_READ_TIMEOUT_SECS`: Give up on a silent stream (default: 0, disabled)
//! - `TRADER_PURCHASE_ACK_GRACE_SECS`: Wait for the buy acknowledgment (default: 10)
//! - `TRADER_STAKE`, `TRADER_CURRENCY`, `TRADER_CONTRACT_TYPE`,
//!   `TRADER_CONTRACT_DURATION`, `TRADER_CONTRACT_DURATION_UNIT`: Contract terms
//!   (default: 0.35 USD CALL for 5 m)
//! - `TRADER_METRICS_PORT`: Prometheus metrics port (default: 0, disabled)
//! - `OTEL_ENABLED`: Export traces over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: window-trader)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use window_trader::infrastructure::telemetry;
use window_trader::{
    LogNotifier, NotificationHub, Notifier, Supervisor, TelegramNotifier, TradeLedger,
    TraderConfig, WsConnector, init_metrics,
};

/// Time allowed for queued notifications to go out after shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (tracing + optional OTLP export)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Window Trader");

    let config = TraderConfig::from_env()?;
    log_config(&config);

    init_metrics(config.metrics_port)?;

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => Arc::new(TelegramNotifier::new(telegram)?),
        None => {
            tracing::warn!("Telegram not configured, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    };
    let (hub, notifications) = NotificationHub::spawn(notifier);

    let ledger = Arc::new(TradeLedger::new(&config.instruments));
    let connector = Arc::new(WsConnector::new(config.venue_endpoint()));

    let supervisor = Supervisor::new(
        config.instruments.clone(),
        Arc::clone(&ledger),
        connector,
        notifications,
        config.pipeline_settings(),
        config.supervisor_settings(),
    );

    let shutdown_token = CancellationToken::new();

    tokio::select! {
        () = supervisor.run(shutdown_token.clone()) => {}
        () = await_shutdown(shutdown_token.clone()) => {}
    }

    tracing::info!(
        traded = ledger.traded_count(),
        instruments = config.instruments.len(),
        "Supervisor stopped"
    );

    // The hub worker exits once the last handle is gone.
    drop(supervisor);
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, hub.drain())
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Timed out delivering pending notifications"
        );
    }

    tracing::info!("Window Trader stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &TraderConfig) {
    tracing::info!(
        instruments = ?config.instruments,
        window_secs = config.timing.window.as_secs(),
        initial_wait_secs = config.timing.initial_wait.as_secs(),
        poll_interval_secs = config.timing.poll_interval.as_secs(),
        stake = %config.contract.amount,
        currency = %config.contract.currency,
        telegram = config.telegram.is_some(),
        metrics_port = config.metrics_port,
        "Configuration loaded"
    );
    tracing::debug!(venue_url = %config.venue_url, "Venue endpoint");
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
