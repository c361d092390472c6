//! Per-interface rate tracking and metrics history.

use std::collections::{HashMap, VecDeque};
use tokio::time::Instant;

use crate::types::{InterfaceRate, MetricsSnapshot};

/// Derives per-interface byte rates from consecutive snapshots.
///
/// Counters are recorded on every snapshot. Rates appear from the second
/// snapshot an interface is seen in, and interfaces missing from a snapshot are
/// forgotten. Counters that go backwards (a reset) yield a zero rate.
#[derive(Debug, Default)]
pub struct RateTracker {
    counters: HashMap<String, (u64, u64)>,
    rates: HashMap<String, InterfaceRate>,
    last_sample: Option<Instant>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, snapshot: &MetricsSnapshot, now: Instant) {
        self.counters.retain(|name, _| snapshot.interface(name).is_some());
        self.rates.retain(|name, _| snapshot.interface(name).is_some());

        let elapsed = self
            .last_sample
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .filter(|secs| *secs > 0.0);

        for iface in &snapshot.interfaces {
            if let (Some(secs), Some((tx, rx))) = (elapsed, self.counters.get(&iface.name)) {
                let rate = InterfaceRate {
                    tx: iface.tx_bytes.saturating_sub(*tx) as f64 / secs,
                    rx: iface.rx_bytes.saturating_sub(*rx) as f64 / secs,
                };
                self.rates.insert(iface.name.clone(), rate);
            }
            self.counters.insert(iface.name.clone(), (iface.tx_bytes, iface.rx_bytes));
        }
        self.last_sample = Some(now);
    }

    /// Rate for `name`, zero when unknown.
    pub fn rate(&self, name: &str) -> InterfaceRate {
        self.rates.get(name).copied().unwrap_or_default()
    }

    pub fn rates(&self) -> &HashMap<String, InterfaceRate> {
        &self.rates
    }

    /// Names with recorded counters.
    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.counters.keys().map(String::as_str)
    }
}

/// Bounded ring buffers of CPU usage and aggregate traffic rates.
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    capacity: usize,
    cpu: VecDeque<f64>,
    tx_rate: VecDeque<f64>,
    rx_rate: VecDeque<f64>,
    last_totals: Option<(u64, u64, Instant)>,
}

impl MetricsHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            cpu: VecDeque::with_capacity(capacity),
            tx_rate: VecDeque::with_capacity(capacity),
            rx_rate: VecDeque::with_capacity(capacity),
            last_totals: None,
        }
    }

    pub fn add_sample(&mut self, snapshot: &MetricsSnapshot, now: Instant) {
        push_bounded(&mut self.cpu, snapshot.cpu, self.capacity);

        let (tx, rx) = snapshot.total_bytes();
        if let Some((last_tx, last_rx, at)) = self.last_totals {
            let secs = now.saturating_duration_since(at).as_secs_f64();
            if secs > 0.0 {
                let tx_rate = tx.saturating_sub(last_tx) as f64 / secs;
                let rx_rate = rx.saturating_sub(last_rx) as f64 / secs;
                push_bounded(&mut self.tx_rate, tx_rate, self.capacity);
                push_bounded(&mut self.rx_rate, rx_rate, self.capacity);
            }
        }
        self.last_totals = Some((tx, rx, now));
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cpu(&self) -> &VecDeque<f64> {
        &self.cpu
    }

    pub fn tx_rate(&self) -> &VecDeque<f64> {
        &self.tx_rate
    }

    pub fn rx_rate(&self) -> &VecDeque<f64> {
        &self.rx_rate
    }
}

fn push_bounded(ring: &mut VecDeque<f64>, value: f64, capacity: usize) {
    if ring.len() >= capacity {
        ring.pop_front();
    }
    ring.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InterfaceMetrics;
    use std::time::Duration;

    fn snapshot(ifaces: &[(&str, u64, u64)]) -> MetricsSnapshot {
        MetricsSnapshot {
            cpu: 10.0,
            interfaces: ifaces
                .iter()
                .map(|(name, rx, tx)| InterfaceMetrics {
                    name: name.to_string(),
                    rx_bytes: *rx,
                    tx_bytes: *tx,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn rates_are_deltas_over_elapsed_seconds() {
        let mut tracker = RateTracker::new();
        let start = Instant::now();
        tracker.record(&snapshot(&[("igb0", 1000, 500)]), start);
        assert_eq!(tracker.rate("igb0"), InterfaceRate::default());

        tracker.record(&snapshot(&[("igb0", 2000, 1100)]), start + Duration::from_secs(5));
        let rate = tracker.rate("igb0");
        assert_eq!(rate.rx, 200.0);
        assert_eq!(rate.tx, 120.0);
    }

    #[test]
    fn vanished_interfaces_are_pruned() {
        let mut tracker = RateTracker::new();
        let start = Instant::now();
        tracker.record(&snapshot(&[("igb0", 0, 0), ("ovpns1", 0, 0)]), start);
        let both = snapshot(&[("igb0", 10, 10), ("ovpns1", 10, 10)]);
        tracker.record(&both, start + Duration::from_secs(1));
        assert!(tracker.rates().contains_key("ovpns1"));

        tracker.record(&snapshot(&[("igb0", 20, 20)]), start + Duration::from_secs(2));
        assert!(!tracker.rates().contains_key("ovpns1"));
        assert_eq!(tracker.tracked().collect::<Vec<_>>(), vec!["igb0"]);
    }

    #[test]
    fn counter_resets_yield_zero() {
        let mut tracker = RateTracker::new();
        let start = Instant::now();
        tracker.record(&snapshot(&[("igb0", 5000, 5000)]), start);
        tracker.record(&snapshot(&[("igb0", 100, 100)]), start + Duration::from_secs(1));
        assert_eq!(tracker.rate("igb0"), InterfaceRate { tx: 0.0, rx: 0.0 });
    }

    #[test]
    fn new_interfaces_start_without_a_rate() {
        let mut tracker = RateTracker::new();
        let start = Instant::now();
        tracker.record(&snapshot(&[("igb0", 0, 0)]), start);
        let first = snapshot(&[("igb0", 0, 0), ("wg0", 900, 900)]);
        tracker.record(&first, start + Duration::from_secs(3));
        assert!(!tracker.rates().contains_key("wg0"));
        let second = snapshot(&[("igb0", 0, 0), ("wg0", 1200, 1200)]);
        tracker.record(&second, start + Duration::from_secs(6));
        assert_eq!(tracker.rate("wg0").rx, 100.0);
    }

    #[test]
    fn history_is_bounded() {
        let mut history = MetricsHistory::new(3);
        let start = Instant::now();
        for i in 0..5u64 {
            let mut snap = snapshot(&[("igb0", i * 100, i * 50)]);
            snap.cpu = i as f64;
            history.add_sample(&snap, start + Duration::from_secs(i));
        }
        assert_eq!(history.cpu().iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.rx_rate().len(), 3);
        assert!(history.rx_rate().iter().all(|r| *r == 100.0));
        assert!(history.tx_rate().iter().all(|r| *r == 50.0));
    }
}
