//! Host metrics snapshots consumed by the status engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Interface status string for an interface that is up with carrier.
pub const STATUS_ACTIVE: &str = "active";

/// Interface status string for an interface without carrier.
pub const STATUS_NO_CARRIER: &str = "no carrier";

/// Point-in-time host metrics.
///
/// Produced wholesale by a [`MetricsProvider`](crate::provider::MetricsProvider) and
/// treated as immutable afterwards; the status engine swaps whole snapshots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub hostname: String,
    /// CPU usage, 0-100
    pub cpu: f64,
    /// Memory in use, bytes
    pub mem_used: u64,
    /// Total memory, bytes
    pub mem_total: u64,
    /// 1, 5 and 15 minute load averages
    pub load_avg: [f64; 3],
    pub uptime_secs: u64,
    pub interfaces: Vec<InterfaceMetrics>,
}

impl MetricsSnapshot {
    /// Memory usage percentage, 0 when the total is unknown.
    pub fn mem_percent(&self) -> f64 {
        if self.mem_total == 0 {
            return 0.0;
        }
        self.mem_used as f64 / self.mem_total as f64 * 100.0
    }

    pub fn uptime(&self) -> Duration {
        Duration::from_secs(self.uptime_secs)
    }

    /// Sum of all interface counters as (tx, rx).
    pub fn total_bytes(&self) -> (u64, u64) {
        self.interfaces.iter().fold((0, 0), |(tx, rx), iface| {
            (tx.saturating_add(iface.tx_bytes), rx.saturating_add(iface.rx_bytes))
        })
    }

    pub fn interface(&self, name: &str) -> Option<&InterfaceMetrics> {
        self.interfaces.iter().find(|iface| iface.name == name)
    }

    /// First interface with an address whose status is `active`.
    pub fn primary_address(&self) -> Option<&str> {
        self.interfaces
            .iter()
            .find(|iface| iface.is_active())
            .map(|iface| iface.ip.as_str())
    }
}

/// Counters and addressing for one network interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceMetrics {
    /// Kernel name, e.g. `igb0`
    pub name: String,
    /// Operator description, e.g. `WAN`
    pub description: String,
    pub status: String,
    pub ip: String,
    /// Cumulative received bytes
    pub rx_bytes: u64,
    /// Cumulative transmitted bytes
    pub tx_bytes: u64,
}

impl InterfaceMetrics {
    /// Active means an address is assigned and the link has carrier.
    pub fn is_active(&self) -> bool {
        !self.ip.is_empty() && self.status == STATUS_ACTIVE
    }

    /// Description when set, kernel name otherwise.
    pub fn display_name(&self) -> &str {
        if self.description.is_empty() {
            &self.name
        } else {
            &self.description
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.tx_bytes.saturating_add(self.rx_bytes)
    }
}

/// Derived throughput for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InterfaceRate {
    /// Transmit rate, bytes/sec
    pub tx: f64,
    /// Receive rate, bytes/sec
    pub rx: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_percent_handles_unknown_total() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.mem_percent(), 0.0);

        let snapshot = MetricsSnapshot {
            mem_used: 512,
            mem_total: 2048,
            ..Default::default()
        };
        assert!((snapshot.mem_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn activity_requires_address_and_carrier() {
        let mut iface = InterfaceMetrics {
            name: "igb0".into(),
            status: STATUS_ACTIVE.into(),
            ip: "192.0.2.1".into(),
            ..Default::default()
        };
        assert!(iface.is_active());
        assert_eq!(iface.display_name(), "igb0");

        iface.description = "WAN".into();
        assert_eq!(iface.display_name(), "WAN");

        iface.status = STATUS_NO_CARRIER.into();
        assert!(!iface.is_active());
    }

    #[test]
    fn snapshots_deserialize_with_missing_fields() {
        let yaml = "hostname: fw01\ncpu: 12.5\ninterfaces:\n  - name: igb0\n    rx_bytes: 10\n";
        let snapshot: MetricsSnapshot = serde_yaml_ng::from_str(yaml).expect("valid yaml");
        assert_eq!(snapshot.hostname, "fw01");
        assert_eq!(snapshot.interfaces[0].rx_bytes, 10);
        assert_eq!(snapshot.interfaces[0].tx_bytes, 0);
        assert_eq!(snapshot.total_bytes(), (0, 10));
    }
}
