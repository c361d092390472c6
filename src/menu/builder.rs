//! Default firewall menu.
//!
//! [`SystemMenuBuilder`] assembles the stock "PFSENSE LCD" tree: live system
//! readings, one row per network interface, backlight and LED controls, and
//! actions that draw the full status pages. Readings come from a
//! [`MetricsFeed`], which caches the last successful snapshot so menu values
//! never wait on the provider while the panel is being drawn.

use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{DEFAULT_VISIBLE_ROWS, MenuId, MenuItem, MenuTree};
use crate::Result;
use crate::display::{SharedDisplay, network_status_template, system_status_template};
use crate::provider::MetricsProvider;
use crate::status::text::format_uptime;
use crate::status::{MetricsFrame, MetricsHistory, RateTracker};
use crate::types::{Led, LedColor, MetricsSnapshot};

/// Shown in place of a reading that is not available yet.
pub const NOT_AVAILABLE: &str = "N/A";

const HISTORY_LEN: usize = 12;

const BACKLIGHT_LEVELS: [(&str, u8); 5] =
    [("Off", 0), ("Low", 64), ("Medium", 128), ("High", 200), ("Max", 255)];

const LED_CHOICES: [(&str, LedColor); 3] =
    [("Off", LedColor::Off), ("Red", LedColor::Red), ("Green", LedColor::Green)];

struct FeedState {
    provider: Box<dyn MetricsProvider>,
    tracker: RateTracker,
    history: MetricsHistory,
    sequence: u64,
}

struct FeedInner {
    state: Mutex<FeedState>,
    latest: watch::Sender<Option<Arc<MetricsFrame>>>,
}

/// On-demand metrics with a cached last frame.
///
/// [`refresh`](Self::refresh) calls the provider; [`latest`](Self::latest)
/// never blocks. A failed refresh leaves the cached frame untouched.
#[derive(Clone)]
pub struct MetricsFeed {
    inner: Arc<FeedInner>,
}

impl MetricsFeed {
    pub fn new<P: MetricsProvider>(provider: P) -> Self {
        let (latest, _) = watch::channel(None);
        let state = FeedState {
            provider: Box::new(provider),
            tracker: RateTracker::new(),
            history: MetricsHistory::new(HISTORY_LEN),
            sequence: 0,
        };
        Self {
            inner: Arc::new(FeedInner {
                state: Mutex::new(state),
                latest,
            }),
        }
    }

    /// Fetch a snapshot and publish it with updated rates.
    pub async fn refresh(&self) -> Result<Arc<MetricsFrame>> {
        let mut state = self.inner.state.lock().await;
        let snapshot = state.provider.get_metrics().await?;
        let now = Instant::now();
        state.tracker.record(&snapshot, now);
        state.history.add_sample(&snapshot, now);
        state.sequence += 1;

        let frame = Arc::new(MetricsFrame {
            rates: state.tracker.rates().clone(),
            history: state.history.clone(),
            sequence: state.sequence,
            snapshot,
        });
        debug!("Menu metrics refreshed (#{})", frame.sequence);
        self.inner.latest.send_replace(Some(Arc::clone(&frame)));
        Ok(frame)
    }

    /// The last published frame, if any refresh has succeeded.
    pub fn latest(&self) -> Option<Arc<MetricsFrame>> {
        self.inner.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<MetricsFrame>>> {
        self.inner.latest.subscribe()
    }

    fn read<F>(&self, read: F) -> String
    where
        F: Fn(&MetricsSnapshot) -> String,
    {
        self.latest().map_or_else(|| NOT_AVAILABLE.to_string(), |frame| read(&frame.snapshot))
    }
}

impl std::fmt::Debug for MetricsFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sequence = self.latest().map(|frame| frame.sequence);
        f.debug_struct("MetricsFeed").field("sequence", &sequence).finish_non_exhaustive()
    }
}

/// Builds the stock menu tree.
///
/// ```text
/// PFSENSE LCD
/// ├── System Status >   CPU, Memory, Load, Uptime, View Full Status
/// ├── Network >         one row per interface, View All Interfaces
/// ├── Display >         Backlight levels, LED Control >
/// ├── Refresh
/// └── Exit Menu
/// ```
#[derive(Debug)]
pub struct SystemMenuBuilder {
    display: SharedDisplay,
    feed: MetricsFeed,
    visible_rows: usize,
}

impl SystemMenuBuilder {
    pub fn new(display: SharedDisplay, feed: MetricsFeed) -> Self {
        Self {
            display,
            feed,
            visible_rows: DEFAULT_VISIBLE_ROWS,
        }
    }

    pub fn visible_rows(mut self, rows: usize) -> Self {
        self.visible_rows = rows;
        self
    }

    /// Fetch metrics once (the network menu lists the interfaces present now)
    /// and build the tree. A failed fetch leaves the network menu with only
    /// its summary action.
    pub async fn build(self) -> MenuTree {
        if let Err(error) = self.feed.refresh().await {
            warn!("Building menu without metrics: {}", error);
        }

        let mut tree = MenuTree::new("PFSENSE LCD").with_visible_rows(self.visible_rows);
        let root = tree.root();

        let status = self.status_menu(&mut tree);
        tree.add_submenu(root, "System Status", status);
        let network = self.network_menu(&mut tree);
        tree.add_submenu(root, "Network", network);
        let display = self.display_menu(&mut tree);
        tree.add_submenu(root, "Display", display);

        tree.add_item(root, self.show_system_status("Refresh"));
        tree.add_item(root, self.show_system_status("Exit Menu"));
        tree
    }

    fn status_menu(&self, tree: &mut MenuTree) -> MenuId {
        let menu = tree.add_menu("SYSTEM STATUS");
        tree.add_item(menu, self.reading("CPU", |m| format!("{:.1}%", m.cpu)));
        tree.add_item(
            menu,
            self.reading("Memory", |m| {
                if m.mem_total > 0 {
                    format!("{:.1}%", m.mem_percent())
                } else {
                    NOT_AVAILABLE.to_string()
                }
            }),
        );
        tree.add_item(menu, self.reading("Load", |m| format!("{:.2}", m.load_avg[0])));
        tree.add_item(menu, self.reading("Uptime", |m| format_uptime(m.uptime())));
        tree.add_item(menu, self.show_system_status("View Full Status"));
        menu
    }

    fn network_menu(&self, tree: &mut MenuTree) -> MenuId {
        let menu = tree.add_menu("NETWORK");
        let names: Vec<String> = self
            .feed
            .latest()
            .map(|frame| {
                frame
                    .snapshot
                    .interfaces
                    .iter()
                    .map(|iface| iface.name.clone())
                    .collect()
            })
            .unwrap_or_default();

        for name in names {
            let label = name.clone();
            tree.add_item(
                menu,
                self.reading(&label, move |m| match m.interface(&name) {
                    Some(iface) if !iface.ip.is_empty() => iface.ip.clone(),
                    Some(iface) => iface.status.clone(),
                    None => NOT_AVAILABLE.to_string(),
                }),
            );
        }

        let display = Arc::clone(&self.display);
        let feed = self.feed.clone();
        tree.add_item(
            menu,
            MenuItem::new("View All Interfaces").with_action(move || {
                let display = Arc::clone(&display);
                let feed = feed.clone();
                async move {
                    let frame = feed.refresh().await?;
                    let mut display = display.lock().await;
                    network_status_template(&frame.snapshot, &frame.rates)
                        .render(&mut display)
                        .await?;
                    anyhow::Ok(())
                }
            }),
        );
        menu
    }

    fn display_menu(&self, tree: &mut MenuTree) -> MenuId {
        let menu = tree.add_menu("DISPLAY");
        for (name, level) in BACKLIGHT_LEVELS {
            let display = Arc::clone(&self.display);
            tree.add_item(
                menu,
                MenuItem::new(format!("Backlight: {name}")).with_action(move || {
                    let display = Arc::clone(&display);
                    async move {
                        display.lock().await.set_backlight(level).await?;
                        anyhow::Ok(())
                    }
                }),
            );
        }

        let leds = tree.add_menu("LED CONTROL");
        for led in Led::ALL {
            for (name, color) in LED_CHOICES {
                let display = Arc::clone(&self.display);
                tree.add_item(
                    leds,
                    MenuItem::new(format!("{led}: {name}")).with_action(move || {
                        let display = Arc::clone(&display);
                        async move {
                            display.lock().await.set_led(led, color).await?;
                            anyhow::Ok(())
                        }
                    }),
                );
            }
        }
        tree.add_submenu(menu, "LED Control", leds);
        menu
    }

    fn reading<F>(&self, label: &str, read: F) -> MenuItem
    where
        F: Fn(&MetricsSnapshot) -> String + Send + Sync + 'static,
    {
        let feed = self.feed.clone();
        MenuItem::new(label).with_value(move || feed.read(&read))
    }

    fn show_system_status(&self, label: &str) -> MenuItem {
        let display = Arc::clone(&self.display);
        let feed = self.feed.clone();
        MenuItem::new(label).with_action(move || {
            let display = Arc::clone(&display);
            let feed = feed.clone();
            async move {
                let frame = feed.refresh().await?;
                let mut display = display.lock().await;
                system_status_template(&frame.snapshot).render(&mut display).await?;
                anyhow::Ok(())
            }
        })
    }
}
