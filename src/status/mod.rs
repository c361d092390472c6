//! Rotating status screens driven by host metrics.
//!
//! [`StatusEngine::spawn`] starts three independent tasks that share one
//! [`SharedDisplay`]:
//!
//! - **metrics refresh** calls the [`MetricsProvider`] every refresh interval and
//!   publishes an immutable [`MetricsFrame`] through a watch channel. Failures
//!   and collections that outlast the metrics timeout leave the previous frame
//!   in place.
//! - **render tick** redraws the active screen from the latest frame every render
//!   interval and keeps the indicator LEDs in sync. Until the first frame
//!   arrives it draws nothing.
//! - **rotation** advances the active screen on its own, longer interval.
//!
//! The render tick never waits on the provider, so a slow or hung metrics
//! source only makes the screens stale.
//!
//! ```rust,no_run
//! use ezio::config::StatusConfig;
//! use ezio::display::Display;
//! use ezio::providers::SystemMetrics;
//! use ezio::status::StatusEngine;
//!
//! # #[tokio::main]
//! # async fn main() -> ezio::Result<()> {
//! let display = Display::open("/dev/ttyS1")?.into_shared();
//! let mut engine = StatusEngine::spawn(display, SystemMetrics::new(), StatusConfig::default());
//! tokio::signal::ctrl_c().await.ok();
//! engine.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod leds;
pub mod screens;
pub mod text;

pub use cache::{MetricsHistory, RateTracker};
pub use leds::{LedState, health_color, led_states};
pub use screens::Screen;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::StatusConfig;
use crate::LcdError;
use crate::display::{Display, SharedDisplay};
use crate::provider::MetricsProvider;
use crate::types::{InterfaceRate, MetricsSnapshot};

/// One published metrics refresh: the snapshot plus everything derived from it.
#[derive(Debug, Clone)]
pub struct MetricsFrame {
    pub snapshot: MetricsSnapshot,
    pub rates: HashMap<String, InterfaceRate>,
    pub history: MetricsHistory,
    /// Successful refreshes so far, starting at 1.
    pub sequence: u64,
}

impl MetricsFrame {
    /// Rate for interface `name`, zero when unknown.
    pub fn rate(&self, name: &str) -> InterfaceRate {
        self.rates.get(name).copied().unwrap_or_default()
    }
}

/// Counters shared between the engine tasks and the handle.
#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    frames: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

/// Spawns the status tasks.
pub struct StatusEngine;

impl StatusEngine {
    pub fn spawn<P>(display: SharedDisplay, provider: P, config: StatusConfig) -> StatusHandle
    where
        P: MetricsProvider,
    {
        let (metrics_tx, metrics_rx) = watch::channel(None);
        let (screen_tx, screen_rx) = watch::channel(0usize);
        let screen_tx = Arc::new(screen_tx);
        let counters = Arc::new(Counters::default());
        let cancel = CancellationToken::new();

        let metrics_task = tokio::spawn(Self::metrics_task(
            provider,
            metrics_tx,
            config.clone(),
            Arc::clone(&counters),
            cancel.clone(),
        ));
        let render_task = tokio::spawn(Self::render_task(
            display,
            metrics_rx.clone(),
            screen_rx.clone(),
            config.clone(),
            Arc::clone(&counters),
            cancel.clone(),
        ));
        let rotate_task =
            tokio::spawn(Self::rotate_task(Arc::clone(&screen_tx), config.clone(), cancel.clone()));

        info!(
            "Status engine started (refresh {:?}, render {:?}, rotate {:?})",
            config.refresh_interval(),
            config.render_interval(),
            config.rotate_interval()
        );

        StatusHandle {
            metrics: metrics_rx,
            screen: screen_rx,
            screen_tx,
            counters,
            cancel,
            tasks: vec![metrics_task, render_task, rotate_task],
        }
    }

    async fn metrics_task<P>(
        mut provider: P,
        metrics_tx: watch::Sender<Option<Arc<MetricsFrame>>>,
        config: StatusConfig,
        counters: Arc<Counters>,
        cancel: CancellationToken,
    ) where
        P: MetricsProvider,
    {
        debug!("Metrics refresh task started");
        let mut ticker = interval(config.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rates = RateTracker::new();
        let mut history = MetricsHistory::new(config.history_len);
        let mut sequence = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = Self::collect(&mut provider, config.metrics_timeout()) => result,
            };

            match result {
                Ok(snapshot) => {
                    let now = Instant::now();
                    rates.record(&snapshot, now);
                    history.add_sample(&snapshot, now);
                    sequence += 1;
                    counters.refreshes.fetch_add(1, Ordering::Relaxed);
                    trace!(
                        "Metrics refresh {}: cpu={:.1} mem={:.1}% ifaces={}",
                        sequence,
                        snapshot.cpu,
                        snapshot.mem_percent(),
                        snapshot.interfaces.len()
                    );
                    let frame = MetricsFrame {
                        snapshot,
                        rates: rates.rates().clone(),
                        history: history.clone(),
                        sequence,
                    };
                    metrics_tx.send_replace(Some(Arc::new(frame)));
                }
                Err(e) => {
                    counters.failures.fetch_add(1, Ordering::Relaxed);
                    warn!("Metrics refresh failed, keeping cached metrics: {}", e);
                }
            }
        }

        debug!("Metrics refresh task ended ({} refreshes)", sequence);
    }

    async fn collect<P>(provider: &mut P, limit: Option<Duration>) -> crate::Result<MetricsSnapshot>
    where
        P: MetricsProvider,
    {
        let Some(limit) = limit else {
            return provider.get_metrics().await;
        };
        match tokio::time::timeout(limit, provider.get_metrics()).await {
            Ok(result) => result,
            Err(_) => Err(LcdError::timed_out(limit)),
        }
    }

    async fn render_task(
        display: SharedDisplay,
        metrics: watch::Receiver<Option<Arc<MetricsFrame>>>,
        screen: watch::Receiver<usize>,
        config: StatusConfig,
        counters: Arc<Counters>,
        cancel: CancellationToken,
    ) {
        debug!("Render task started");
        let mut ticker = interval(config.render_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut applied_leds: Option<LedState> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            counters.ticks.fetch_add(1, Ordering::Relaxed);

            let latest = metrics.borrow().clone();
            let Some(data) = latest else {
                trace!("No metrics yet, skipping render");
                continue;
            };
            let frame = counters.frames.fetch_add(1, Ordering::Relaxed) + 1;
            let active = Screen::at(*screen.borrow());

            let mut guard = tokio::select! {
                _ = cancel.cancelled() => break,
                guard = display.lock() => guard,
            };

            let leds = led_states(active, &data.snapshot, &config.thresholds);
            if applied_leds != Some(leds) {
                applied_leds = Self::apply_leds(&mut guard, leds).await.then_some(leds);
            }

            if let Err(e) = active.render(&mut guard, &data, frame).await {
                warn!("Render of {} failed: {}", active, e);
            }
        }

        debug!("Render task ended ({} frames)", counters.frames.load(Ordering::Relaxed));
    }

    /// Returns whether every LED was written.
    async fn apply_leds(display: &mut Display, leds: LedState) -> bool {
        for (led, color) in leds.colors() {
            if let Err(e) = display.set_led(led, color).await {
                warn!("Failed to set {} LED: {}", led, e);
                return false;
            }
        }
        debug!("LEDs info={} health={} home={}", leds.info, leds.health, leds.home);
        true
    }

    async fn rotate_task(
        screen: Arc<watch::Sender<usize>>,
        config: StatusConfig,
        cancel: CancellationToken,
    ) {
        let period = config.rotate_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            screen.send_modify(|index| *index = (*index + 1) % Screen::ALL.len());
            debug!("Rotated to {}", Screen::at(*screen.borrow()));
        }
    }
}

/// Observes and stops a running status engine. Dropping the handle cancels the
/// tasks without waiting for them.
#[derive(Debug)]
pub struct StatusHandle {
    metrics: watch::Receiver<Option<Arc<MetricsFrame>>>,
    screen: watch::Receiver<usize>,
    screen_tx: Arc<watch::Sender<usize>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl StatusHandle {
    /// Latest published metrics, if any refresh has succeeded.
    pub fn current_metrics(&self) -> Option<Arc<MetricsFrame>> {
        self.metrics.borrow().clone()
    }

    pub fn subscribe_metrics(&self) -> watch::Receiver<Option<Arc<MetricsFrame>>> {
        self.metrics.clone()
    }

    pub fn current_screen(&self) -> Screen {
        Screen::at(*self.screen.borrow())
    }

    /// Jump to `screen`; rotation continues from there.
    pub fn show_screen(&self, screen: Screen) {
        self.screen_tx.send_replace(screen.index());
    }

    /// Render ticks fired, including those skipped for lack of metrics.
    pub fn ticks(&self) -> u64 {
        self.counters.ticks.load(Ordering::Relaxed)
    }

    /// Frames actually rendered.
    pub fn frames(&self) -> u64 {
        self.counters.frames.load(Ordering::Relaxed)
    }

    pub fn refreshes(&self) -> u64 {
        self.counters.refreshes.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.counters.failures.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Cancel all tasks and wait for them to finish. Safe to call repeatedly.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Status task failed: {}", e);
            }
        }
        info!("Status engine stopped");
    }
}

impl Drop for StatusHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{DeviceLink, LinkOptions, MemoryPortHandle};
    use crate::providers::{ReplayMetrics, ReplayStep};
    use crate::test_utils::sample_snapshot;
    use std::time::Duration;

    fn shared_display() -> (SharedDisplay, MemoryPortHandle) {
        let (link, handle) = DeviceLink::memory(LinkOptions {
            command_delay: Duration::ZERO,
            dump_payloads: false,
        });
        (Display::from_link(link).into_shared(), handle)
    }

    #[tokio::test(start_paused = true)]
    async fn first_refresh_publishes_and_renders() {
        let (display, port) = shared_display();
        let provider = ReplayMetrics::repeating(sample_snapshot());
        let mut handle = StatusEngine::spawn(display, provider, StatusConfig::default());

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(handle.refreshes(), 1);
        assert!(handle.current_metrics().is_some());
        assert!(handle.frames() >= 2);
        assert!(!port.written().is_empty());

        handle.stop().await;
        handle.stop().await;
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn leds_are_only_written_when_they_change() {
        let (display, port) = shared_display();
        let provider = ReplayMetrics::repeating(sample_snapshot());
        let mut handle = StatusEngine::spawn(display, provider, StatusConfig::default());

        // Each LED change and each frame upload is one flush
        tokio::time::sleep(Duration::from_millis(600)).await;
        let frames = handle.frames();
        let calls = port.write_calls();
        assert!(frames >= 1);
        assert_eq!(calls, frames as usize + 3);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(handle.frames() > frames);
        assert_eq!(port.write_calls() - calls, (handle.frames() - frames) as usize);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hung_collection_times_out_and_recovers() {
        let (display, _port) = shared_display();
        let provider = ReplayMetrics::new(vec![
            ReplayStep::Snapshot(sample_snapshot()),
            ReplayStep::Stall,
            ReplayStep::Snapshot(sample_snapshot()),
        ]);
        let config = StatusConfig {
            metrics_timeout_ms: 2000,
            ..StatusConfig::default()
        };
        let mut handle = StatusEngine::spawn(display, provider, config);

        tokio::time::sleep(Duration::from_millis(7500)).await;
        assert_eq!(handle.refreshes(), 1);
        assert_eq!(handle.failures(), 1);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(handle.refreshes(), 2);
        assert_eq!(handle.current_metrics().map(|frame| frame.sequence), Some(2));

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn rotation_advances_and_wraps() {
        let (display, _port) = shared_display();
        let provider = ReplayMetrics::repeating(sample_snapshot());
        let config = StatusConfig {
            rotate_interval_ms: 1000,
            ..StatusConfig::default()
        };
        let mut handle = StatusEngine::spawn(display, provider, config);

        assert_eq!(handle.current_screen(), Screen::Logo);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.current_screen(), Screen::Cpu);
        tokio::time::sleep(Duration::from_millis(6000)).await;
        assert_eq!(handle.current_screen(), Screen::Logo);

        handle.show_screen(Screen::LanTraffic);
        assert_eq!(handle.current_screen(), Screen::LanTraffic);
        handle.stop().await;
    }
}
