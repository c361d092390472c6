//! The fixed set of rotating status screens.

use std::cmp::Reverse;

use super::MetricsFrame;
use super::text::{draw_bar, format_clock, format_rate, scroll_text};
use crate::Result;
use crate::display::Display;
use crate::font::{Font, render_text, render_text_inverted};
use crate::framebuffer::FrameBuffer;
use crate::types::InterfaceMetrics;

/// Rows shown by the list screens before paginating.
const LIST_ROWS: usize = 5;
const LIST_TOP: i32 = 11;
const LIST_ROW_HEIGHT: i32 = 10;
const WAN_ROWS: usize = 4;

/// Layout of a paginated per-interface traffic list.
struct TrafficList {
    title: &'static str,
    filter: fn(&InterfaceMetrics) -> bool,
    /// Frames per page step.
    period: u64,
    empty_x: i32,
    empty_text: &'static str,
}

const TUNNEL_LIST: TrafficList = TrafficList {
    title: " TUNNEL TRAFFIC ",
    filter: is_tunnel,
    period: 15,
    empty_x: 15,
    empty_text: "No tunnels",
};

const LAN_LIST: TrafficList = TrafficList {
    title: " LAN TRAFFIC ",
    filter: is_lan,
    period: 25,
    empty_x: 10,
    empty_text: "No LAN interfaces",
};

/// One status screen. Screens rotate in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Logo,
    Cpu,
    Memory,
    Interfaces,
    WanTraffic,
    TunnelTraffic,
    LanTraffic,
}

impl Screen {
    pub const ALL: [Screen; 7] = [
        Screen::Logo,
        Screen::Cpu,
        Screen::Memory,
        Screen::Interfaces,
        Screen::WanTraffic,
        Screen::TunnelTraffic,
        Screen::LanTraffic,
    ];

    /// Screen at rotation position `index`, wrapping.
    pub fn at(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Screen::Logo => "Logo",
            Screen::Cpu => "CPU",
            Screen::Memory => "Memory",
            Screen::Interfaces => "Interfaces",
            Screen::WanTraffic => "WAN Traffic",
            Screen::TunnelTraffic => "Tunnel Traffic",
            Screen::LanTraffic => "LAN Traffic",
        }
    }

    pub fn is_traffic(self) -> bool {
        matches!(self, Screen::WanTraffic | Screen::TunnelTraffic | Screen::LanTraffic)
    }

    /// Clear `fb` and draw this screen for animation frame `frame`.
    pub fn draw(self, fb: &mut FrameBuffer, font: &dyn Font, data: &MetricsFrame, frame: u64) {
        fb.clear();
        match self {
            Screen::Logo => draw_logo_screen(fb, font, data, frame),
            Screen::Cpu => draw_cpu(fb, font, data),
            Screen::Memory => draw_memory(fb, font, data),
            Screen::Interfaces => draw_interfaces(fb, font, data, frame),
            Screen::WanTraffic => draw_wan(fb, font, data, frame),
            Screen::TunnelTraffic => draw_traffic_list(fb, font, data, frame, &TUNNEL_LIST),
            Screen::LanTraffic => draw_traffic_list(fb, font, data, frame, &LAN_LIST),
        }
    }

    /// Draw into the display's frame buffer and upload it.
    pub async fn render(
        self,
        display: &mut Display,
        data: &MetricsFrame,
        frame: u64,
    ) -> Result<()> {
        let font = display.font_handle();
        self.draw(display.frame_buffer_mut(), font.as_ref(), data, frame);
        display.update().await
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub fn is_wan(iface: &InterfaceMetrics) -> bool {
    iface.description.starts_with("WAN")
}

pub fn is_tunnel(iface: &InterfaceMetrics) -> bool {
    iface.name.starts_with("tun_wg")
        || ["GW_", "WG_", "MULLVAD"].iter().any(|prefix| iface.description.starts_with(prefix))
}

/// Described interfaces that are neither WAN nor tunnels.
pub fn is_lan(iface: &InterfaceMetrics) -> bool {
    !iface.description.is_empty() && !is_wan(iface) && !is_tunnel(iface)
}

/// Matching interfaces, busiest first.
fn by_traffic<'a>(
    data: &'a MetricsFrame,
    filter: impl Fn(&InterfaceMetrics) -> bool,
) -> Vec<&'a InterfaceMetrics> {
    let mut list: Vec<&InterfaceMetrics> = data
        .snapshot
        .interfaces
        .iter()
        .filter(|i| filter(*i))
        .collect();
    list.sort_by_key(|iface| Reverse(iface.total_bytes()));
    list
}

/// Up to [`LIST_ROWS`] entries starting at the page offset for `frame`.
fn visible_window<T: Copy>(items: &[T], frame: u64, period: u64) -> Vec<T> {
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }
    let start = if total > LIST_ROWS {
        (frame / period) as usize % total
    } else {
        0
    };
    (0..LIST_ROWS.min(total)).map(|i| items[(start + i) % total]).collect()
}

fn draw_overflow(fb: &mut FrameBuffer, font: &dyn Font, total: usize) {
    if total > LIST_ROWS {
        render_text(fb, font, 110, 55, &format!("+{}", total - LIST_ROWS));
    }
}

/// Static "pf" mark centred on `(cx, cy)`.
pub fn draw_logo(fb: &mut FrameBuffer, cx: i32, cy: i32) {
    let radius = 8;
    let px = cx - 12;
    fb.draw_circle(px, cy - 4, radius, true);
    fb.draw_circle(px, cy - 4, radius - 3, false);
    let stem = px - radius;
    fb.draw_line(stem, cy - radius, stem, cy + 12, true);
    fb.draw_line(stem + 1, cy - radius, stem + 1, cy + 12, true);

    let fx = cx + 12;
    fb.draw_line(fx, cy - 12, fx, cy + 8, true);
    fb.draw_line(fx + 1, cy - 12, fx + 1, cy + 8, true);
    fb.hline(fx + 1, fx + 4, cy - 12, true);
    fb.draw_line(fx - 4, cy - 2, fx + 4, cy - 2, true);
    fb.draw_line(fx - 4, cy - 1, fx + 4, cy - 1, true);
}

fn draw_logo_screen(fb: &mut FrameBuffer, font: &dyn Font, data: &MetricsFrame, frame: u64) {
    let m = &data.snapshot;
    draw_logo(fb, 28, 32);

    let x = 58;
    render_text(fb, font, x, 2, "pfSense");
    render_text(fb, font, x, 12, &scroll_text(&m.hostname, 11, frame));
    render_text(fb, font, x, 24, &format_clock(m.uptime()));
    render_text(fb, font, x, 38, &format!("CPU: {:.0}%", m.cpu));
    render_text(fb, font, x, 48, &format!("MEM: {:.0}%", m.mem_percent()));
}

fn draw_cpu(fb: &mut FrameBuffer, font: &dyn Font, data: &MetricsFrame) {
    let m = &data.snapshot;
    render_text_inverted(fb, font, 0, 0, " CPU ");
    render_text(fb, font, 0, 14, &format!("Usage: {:.1}%", m.cpu));
    draw_bar(fb, 0, 26, 125, 10, m.cpu);

    let [one, five, fifteen] = m.load_avg;
    render_text(fb, font, 0, 42, &format!("Load: {:.2} {:.2} {:.2}", one, five, fifteen));
    let secs = m.uptime_secs;
    render_text(fb, font, 0, 54, &format!("Uptime: {}d {}h", secs / 86_400, secs / 3600 % 24));
}

fn draw_memory(fb: &mut FrameBuffer, font: &dyn Font, data: &MetricsFrame) {
    let m = &data.snapshot;
    let percent = m.mem_percent();
    render_text_inverted(fb, font, 0, 0, " MEMORY ");
    render_text(fb, font, 0, 14, &format!("Usage: {:.1}%", percent));
    draw_bar(fb, 0, 26, 125, 10, percent);

    let used_mb = m.mem_used / 1024 / 1024;
    let total_mb = m.mem_total / 1024 / 1024;
    render_text(fb, font, 0, 42, &format!("Used: {} MB", used_mb));
    render_text(fb, font, 0, 54, &format!("Free: {} MB", total_mb.saturating_sub(used_mb)));
}

fn draw_interfaces(fb: &mut FrameBuffer, font: &dyn Font, data: &MetricsFrame, frame: u64) {
    render_text_inverted(fb, font, 0, 0, " INTERFACES ");

    let active = by_traffic(data, InterfaceMetrics::is_active);
    let mut y = LIST_TOP;
    for iface in visible_window(&active, frame, 15) {
        render_text(fb, font, 0, y, &scroll_text(iface.display_name(), 8, frame));
        render_text(fb, font, 55, y, &iface.ip);
        y += LIST_ROW_HEIGHT;
    }

    draw_overflow(fb, font, active.len());
    if active.is_empty() {
        render_text(fb, font, 10, 30, "No active ifaces");
    }
}

fn draw_wan(fb: &mut FrameBuffer, font: &dyn Font, data: &MetricsFrame, frame: u64) {
    render_text_inverted(fb, font, 0, 0, " WAN TRAFFIC ");

    let mut y = 12;
    let mut count = 0;
    for iface in data.snapshot.interfaces.iter().filter(|i| is_wan(i)).take(WAN_ROWS) {
        let rate = data.rate(&iface.name);
        render_text(fb, font, 0, y, &scroll_text(&iface.description, 10, frame));
        render_text(
            fb,
            font,
            0,
            y + 10,
            &format!("  TX:{} RX:{}", format_rate(rate.tx), format_rate(rate.rx)),
        );
        y += 24;
        count += 1;
    }
    if count == 0 {
        render_text(fb, font, 10, 30, "No WAN interfaces");
    }
}

fn draw_traffic_list(
    fb: &mut FrameBuffer,
    font: &dyn Font,
    data: &MetricsFrame,
    frame: u64,
    layout: &TrafficList,
) {
    render_text_inverted(fb, font, 0, 0, layout.title);

    let list = by_traffic(data, layout.filter);
    let mut y = LIST_TOP;
    for iface in visible_window(&list, frame, layout.period) {
        let rate = data.rate(&iface.name);
        render_text(fb, font, 0, y, &scroll_text(iface.display_name(), 8, frame));
        let rates = format!("T{} R{}", format_rate(rate.tx), format_rate(rate.rx));
        render_text(fb, font, 52, y, &rates);
        y += LIST_ROW_HEIGHT;
    }

    draw_overflow(fb, font, list.len());
    if list.is_empty() {
        render_text(fb, font, layout.empty_x, 30, layout.empty_text);
    }
}
