//! Fixtures shared by unit tests and benches.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::display::Display;
use crate::link::{DeviceLink, LinkOptions, MemoryPortHandle};
use crate::status::{MetricsFrame, MetricsHistory};
use crate::types::{InterfaceMetrics, InterfaceRate, MetricsSnapshot, STATUS_ACTIVE};

/// Link options with no inter-command delay.
pub fn fast_options() -> LinkOptions {
    LinkOptions {
        command_delay: Duration::ZERO,
        dump_payloads: false,
    }
}

/// A display over an in-memory port.
pub fn memory_display() -> (Display, MemoryPortHandle) {
    let (link, handle) = DeviceLink::memory(fast_options());
    (Display::from_link(link), handle)
}

pub fn interface(
    name: &str,
    description: &str,
    status: &str,
    ip: &str,
    rx: u64,
    tx: u64,
) -> InterfaceMetrics {
    InterfaceMetrics {
        name: name.to_string(),
        description: description.to_string(),
        status: status.to_string(),
        ip: ip.to_string(),
        rx_bytes: rx,
        tx_bytes: tx,
    }
}

/// A small firewall: WAN, LAN, one WireGuard tunnel and an unplugged port.
pub fn sample_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        hostname: "fw01.example.net".to_string(),
        cpu: 23.5,
        mem_used: 2 * 1024 * 1024 * 1024,
        mem_total: 8 * 1024 * 1024 * 1024,
        load_avg: [0.42, 0.35, 0.30],
        uptime_secs: 3 * 86_400 + 4 * 3600 + 5 * 60,
        interfaces: vec![
            interface("igb0", "WAN", STATUS_ACTIVE, "203.0.113.7", 9_000_000, 1_000_000),
            interface("igb1", "LAN", STATUS_ACTIVE, "192.168.1.1", 800_000, 7_500_000),
            interface("tun_wg0", "WG_HOME", STATUS_ACTIVE, "10.8.0.1", 50_000, 40_000),
            interface("igb2", "", "no carrier", "", 0, 0),
        ],
    }
}

/// [`sample_snapshot`] with a known rate for every interface.
pub fn sample_frame() -> MetricsFrame {
    let snapshot = sample_snapshot();
    let rates: HashMap<String, InterfaceRate> = snapshot
        .interfaces
        .iter()
        .enumerate()
        .map(|(i, iface)| {
            let rate = InterfaceRate {
                tx: 512.0 * i as f64,
                rx: 2048.0 * i as f64,
            };
            (iface.name.clone(), rate)
        })
        .collect();
    MetricsFrame {
        snapshot,
        rates,
        history: MetricsHistory::new(12),
        sequence: 1,
    }
}

/// A unique path in the system temp directory.
pub fn temp_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ezio-{}-{}", tag, std::process::id()))
}
