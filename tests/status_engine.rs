//! Status engine behavior over an in-memory panel with scripted metrics.

use std::time::Duration;

use ezio::config::StatusConfig;
use ezio::providers::{ReplayMetrics, ReplayStep};
use ezio::status::{Screen, StatusEngine};
use ezio::types::{InterfaceMetrics, MetricsSnapshot, STATUS_ACTIVE};
use ezio::{Ezio, LinkOptions, MemoryPortHandle, SharedDisplay};

fn panel() -> (SharedDisplay, MemoryPortHandle) {
    let (display, port) = Ezio::dry_run(LinkOptions {
        command_delay: Duration::ZERO,
        dump_payloads: false,
    });
    (display.into_shared(), port)
}

fn wan(rx_bytes: u64, tx_bytes: u64) -> InterfaceMetrics {
    InterfaceMetrics {
        name: "igb0".to_string(),
        description: "WAN".to_string(),
        status: STATUS_ACTIVE.to_string(),
        ip: "198.51.100.2".to_string(),
        rx_bytes,
        tx_bytes,
    }
}

fn lan(rx_bytes: u64, tx_bytes: u64) -> InterfaceMetrics {
    InterfaceMetrics {
        name: "igb1".to_string(),
        description: "LAN".to_string(),
        status: STATUS_ACTIVE.to_string(),
        ip: "192.168.1.1".to_string(),
        rx_bytes,
        tx_bytes,
    }
}

fn snapshot(interfaces: Vec<InterfaceMetrics>) -> MetricsSnapshot {
    MetricsSnapshot {
        hostname: "edge".to_string(),
        cpu: 12.0,
        mem_used: 1 << 30,
        mem_total: 4 << 30,
        load_avg: [0.1, 0.2, 0.3],
        uptime_secs: 3600,
        interfaces,
    }
}

#[tokio::test(start_paused = true)]
async fn render_tick_survives_a_hung_provider() {
    let _ = tracing_subscriber::fmt::try_init();
    let (display, port) = panel();
    let provider = ReplayMetrics::new(vec![
        ReplayStep::Snapshot(snapshot(vec![wan(0, 0)])),
        ReplayStep::Stall,
    ]);
    let mut engine = StatusEngine::spawn(display, provider, StatusConfig::default());

    tokio::time::sleep(Duration::from_millis(5500)).await;
    let ticks = engine.ticks();
    let frames = engine.frames();
    assert_eq!(engine.refreshes(), 1);

    // The second refresh hangs until the metrics timeout; rendering carries on from the cache
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(engine.ticks() >= ticks + 19);
    assert!(engine.frames() >= frames + 19);
    assert_eq!(engine.refreshes(), 1);
    assert!(!port.written().is_empty());

    engine.stop().await;
    assert!(!engine.is_running());
}

#[tokio::test(start_paused = true)]
async fn nothing_is_drawn_before_the_first_snapshot() {
    let (display, port) = panel();
    let provider = ReplayMetrics::new(vec![ReplayStep::Stall]);
    let mut engine = StatusEngine::spawn(display, provider, StatusConfig::default());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(engine.ticks() >= 6);
    assert_eq!(engine.frames(), 0);
    assert!(engine.current_metrics().is_none());
    assert!(port.written().is_empty());

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn rates_are_derived_between_refreshes() {
    let (display, _port) = panel();
    let provider = ReplayMetrics::from_snapshots([
        snapshot(vec![wan(1000, 500), lan(10, 10)]),
        snapshot(vec![wan(2000, 1100)]),
    ]);
    let mut engine = StatusEngine::spawn(display, provider, StatusConfig::default());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let first = engine.current_metrics().expect("first frame");
    assert_eq!(first.sequence, 1);
    assert!(first.rates.is_empty());

    tokio::time::sleep(Duration::from_secs(5)).await;
    let second = engine.current_metrics().expect("second frame");
    assert_eq!(second.sequence, 2);
    let rate = second.rate("igb0");
    assert!((rate.rx - 200.0).abs() < 1e-9, "rx rate {}", rate.rx);
    assert!((rate.tx - 120.0).abs() < 1e-9, "tx rate {}", rate.tx);

    // igb1 vanished in the second snapshot
    assert!(!second.rates.contains_key("igb1"));
    assert_eq!(second.rates.len(), 1);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_keeps_the_cached_frame() {
    let (display, _port) = panel();
    let provider = ReplayMetrics::new(vec![
        ReplayStep::Snapshot(snapshot(vec![wan(0, 0)])),
        ReplayStep::Fail("sysctl timed out".to_string()),
    ]);
    let mut engine = StatusEngine::spawn(display, provider, StatusConfig::default());

    tokio::time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(engine.refreshes(), 1);
    assert_eq!(engine.failures(), 1);
    let cached = engine.current_metrics().expect("cached frame");
    assert_eq!(cached.sequence, 1);
    assert_eq!(cached.snapshot.hostname, "edge");

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_each_refresh() {
    let (display, _port) = panel();
    let provider = ReplayMetrics::repeating(snapshot(vec![wan(0, 0)]));
    let config = StatusConfig {
        refresh_interval_ms: 1000,
        ..StatusConfig::default()
    };
    let mut engine = StatusEngine::spawn(display, provider, config);
    let mut updates = engine.subscribe_metrics();

    for expected in 1..=3 {
        updates.changed().await.expect("engine running");
        let sequence = updates.borrow_and_update().as_ref().map(|frame| frame.sequence);
        assert_eq!(sequence, Some(expected));
    }
    assert_eq!(engine.current_screen(), Screen::Logo);

    engine.stop().await;
}
