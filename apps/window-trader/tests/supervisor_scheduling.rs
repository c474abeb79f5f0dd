//! Supervisor Integration Tests
//!
//! First pass, periodic relaunch of untraded instruments and cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{RecordingNotifier, ScriptedConnector, flush, immediate_settings, tick, venue_error};
use tokio_util::sync::CancellationToken;
use window_trader::{
    BatchReport, Instrument, NotificationHandle, Supervisor, SupervisorSettings, TradeLedger,
};

fn instruments(symbols: &[&str]) -> Vec<Instrument> {
    symbols.iter().copied().map(Instrument::new).collect()
}

fn supervisor(
    symbols: &[&str],
    connector: &ScriptedConnector,
    handle: &NotificationHandle,
    settings: SupervisorSettings,
) -> Supervisor {
    let instruments = instruments(symbols);
    let ledger = Arc::new(TradeLedger::new(&instruments));
    Supervisor::new(
        instruments,
        ledger,
        connector.as_port(),
        handle.clone(),
        immediate_settings(),
        settings,
    )
}

fn no_wait() -> SupervisorSettings {
    SupervisorSettings {
        initial_wait: Duration::ZERO,
        poll_interval: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn failed_instrument_is_retried_on_the_next_cycle() {
    let connector = ScriptedConnector::new();
    connector.script("R_10", vec![tick("R_10", 1.0)]);
    connector
        .script("R_25", vec![venue_error("Market is closed")])
        .script("R_25", vec![tick("R_25", 1.0)]);
    let notifier = RecordingNotifier::new();
    let (hub, handle) = notifier.spawn_hub();

    let supervisor = supervisor(&["R_10", "R_25"], &connector, &handle, no_wait());

    let first = supervisor.run_first_pass().await;
    assert_eq!(
        first,
        BatchReport {
            launched: 2,
            purchased: 1,
            failed: 1,
            skipped: 0,
        }
    );
    assert!(supervisor.ledger().is_traded(&Instrument::new("R_10")));
    assert!(!supervisor.ledger().is_traded(&Instrument::new("R_25")));

    let retry = supervisor.run_cycle().await;
    assert_eq!(
        retry,
        BatchReport {
            launched: 1,
            purchased: 1,
            failed: 0,
            skipped: 1,
        }
    );
    assert_eq!(supervisor.ledger().traded_count(), 2);

    let idle = supervisor.run_cycle().await;
    assert_eq!(idle.launched, 0);
    assert_eq!(idle.skipped, 2);

    assert_eq!(connector.subscriptions("R_10"), 1);
    assert_eq!(connector.subscriptions("R_25"), 2);
    assert_eq!(connector.buys("R_10"), 1);
    assert_eq!(connector.buys("R_25"), 1);
    assert_eq!(connector.opens(), connector.closes());

    drop(supervisor);
    flush(hub, handle).await;
}

#[tokio::test]
async fn first_pass_announces_waiting_then_continuing() {
    let connector = ScriptedConnector::new();
    connector.script("R_10", vec![tick("R_10", 1.0)]);
    let notifier = RecordingNotifier::new();
    let (hub, handle) = notifier.spawn_hub();

    let settings = SupervisorSettings {
        initial_wait: Duration::from_millis(50),
        poll_interval: Duration::from_millis(10),
    };
    let supervisor = supervisor(&["R_10"], &connector, &handle, settings);

    let started = tokio::time::Instant::now();
    supervisor.run_first_pass().await;
    assert!(started.elapsed() >= Duration::from_millis(50));

    drop(supervisor);
    flush(hub, handle).await;

    let messages = notifier.messages();
    assert!(messages.first().unwrap().starts_with("⏳ Waiting"));
    assert!(messages.last().unwrap().contains("Continuous monitoring started"));
    assert!(messages.iter().any(|m| m.contains("Trade purchased") || m.contains("window complete")));
}

#[tokio::test]
async fn continuing_notice_does_not_wait_for_slow_pipelines() {
    let connector = ScriptedConnector::new();
    connector.script(
        "R_50",
        vec![common::Step::Delay(Duration::from_millis(300)), tick("R_50", 1.0)],
    );
    let notifier = RecordingNotifier::new();
    let (hub, handle) = notifier.spawn_hub();

    let settings = SupervisorSettings {
        initial_wait: Duration::from_millis(20),
        poll_interval: Duration::from_millis(10),
    };
    let supervisor = supervisor(&["R_50"], &connector, &handle, settings);
    supervisor.run_first_pass().await;

    drop(supervisor);
    flush(hub, handle).await;

    let messages = notifier.messages();
    let continuing = messages
        .iter()
        .position(|m| m.contains("Continuous monitoring started"))
        .unwrap();
    let window = messages
        .iter()
        .position(|m| m.contains("window complete for R_50"))
        .unwrap();
    assert!(continuing < window, "{messages:?}");
}

#[tokio::test]
async fn in_flight_instruments_are_skipped() {
    let connector = ScriptedConnector::new();
    let notifier = RecordingNotifier::new();
    let (hub, handle) = notifier.spawn_hub();

    let supervisor = supervisor(&["R_10", "R_25"], &connector, &handle, no_wait());
    let held = supervisor.ledger().claim(&Instrument::new("R_10")).unwrap();

    let report = supervisor.run_cycle().await;
    assert_eq!(report.launched, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(connector.subscriptions("R_10"), 0);
    assert_eq!(connector.subscriptions("R_25"), 1);

    drop(held);
    let report = supervisor.run_cycle().await;
    assert_eq!(report.launched, 2);

    drop(supervisor);
    flush(hub, handle).await;
}

#[tokio::test]
async fn refused_connections_are_retried_each_cycle() {
    let connector = ScriptedConnector::new();
    connector.fail_next_opens(2);
    connector.script("R_75", vec![tick("R_75", 1.0)]);
    let notifier = RecordingNotifier::new();
    let (hub, handle) = notifier.spawn_hub();

    let supervisor = supervisor(&["R_75"], &connector, &handle, no_wait());

    assert_eq!(supervisor.run_first_pass().await.failed, 1);
    assert_eq!(supervisor.run_cycle().await.failed, 1);
    assert_eq!(supervisor.run_cycle().await.purchased, 1);
    assert!(supervisor.ledger().is_traded(&Instrument::new("R_75")));

    drop(supervisor);
    flush(hub, handle).await;
}

#[tokio::test]
async fn run_stops_on_cancellation_and_never_relaunches_traded() {
    let connector = ScriptedConnector::new();
    connector.script("R_10", vec![tick("R_10", 1.0)]);
    let notifier = RecordingNotifier::new();
    let (hub, handle) = notifier.spawn_hub();

    let supervisor = Arc::new(supervisor(
        &["R_10", "R_100"],
        &connector,
        &handle,
        SupervisorSettings {
            initial_wait: Duration::from_millis(10),
            poll_interval: Duration::from_millis(10),
        },
    ));
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        let cancel = cancel.clone();
        async move { supervisor.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("supervisor should stop after cancellation")
        .unwrap();

    assert_eq!(connector.subscriptions("R_10"), 1);
    assert_eq!(connector.buys("R_10"), 1);
    assert!(connector.subscriptions("R_100") > 1, "untraded instrument should be relaunched");
    assert_eq!(connector.buys("R_100"), 0);

    drop(supervisor);
    flush(hub, handle).await;
}
