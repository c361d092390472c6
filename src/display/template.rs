//! Label/value text layouts.

use std::collections::HashMap;

use super::Display;
use crate::Result;
use crate::font;
use crate::framebuffer::HEIGHT;
use crate::status::text::{format_rate, format_uptime};
use crate::types::{InterfaceRate, MetricsSnapshot};

/// One `Label: Value` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub label: String,
    pub value: String,
}

impl StatusLine {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The rendered row; just the label when the value is empty.
    pub fn text(&self) -> String {
        if self.value.is_empty() {
            self.label.clone()
        } else {
            format!("{}: {}", self.label, self.value)
        }
    }
}

/// An inverted title followed by one text row per [`StatusLine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTemplate {
    pub title: String,
    pub lines: Vec<StatusLine>,
}

impl StatusTemplate {
    /// Draw into the display's frame buffer without uploading. Rows that would
    /// start below the panel are dropped.
    pub fn draw(&self, display: &mut Display) {
        let font = display.font.clone();
        let height = font.height();
        let fb = &mut display.fb;
        fb.clear();

        let mut y = 0;
        if !self.title.is_empty() {
            font::render_text_inverted(fb, font.as_ref(), 0, y, &self.title);
            y += height;
        }
        for line in &self.lines {
            if y >= HEIGHT as i32 {
                break;
            }
            font::render_text(fb, font.as_ref(), 0, y, &line.text());
            y += height;
        }
    }

    /// Draw and upload.
    pub async fn render(&self, display: &mut Display) -> Result<()> {
        self.draw(display);
        display.update().await
    }
}

/// Host summary: hostname, uptime, CPU, memory, load and primary address.
/// Rows with no data are omitted.
pub fn system_status_template(metrics: &MetricsSnapshot) -> StatusTemplate {
    let mut lines = Vec::new();
    if !metrics.hostname.is_empty() {
        lines.push(StatusLine::new("Host", metrics.hostname.as_str()));
    }
    if metrics.uptime_secs > 0 {
        lines.push(StatusLine::new("Up", format_uptime(metrics.uptime())));
    }
    if metrics.cpu > 0.0 {
        lines.push(StatusLine::new("CPU", format!("{:.1}%", metrics.cpu)));
    }
    if metrics.mem_total > 0 {
        lines.push(StatusLine::new("Mem", format!("{:.1}%", metrics.mem_percent())));
    }
    if metrics.load_avg.iter().any(|load| *load > 0.0) {
        let [one, five, fifteen] = metrics.load_avg;
        lines.push(StatusLine::new("Load", format!("{:.2} {:.2} {:.2}", one, five, fifteen)));
    }
    if let Some(ip) = metrics.primary_address() {
        lines.push(StatusLine::new("IP", ip));
    }
    StatusTemplate {
        title: "PFSENSE STATUS".to_string(),
        lines,
    }
}

/// One row per interface (address, or status when unaddressed), followed by a
/// traffic row when a rate is known.
pub fn network_status_template(
    metrics: &MetricsSnapshot,
    rates: &HashMap<String, InterfaceRate>,
) -> StatusTemplate {
    let mut lines = Vec::new();
    for iface in &metrics.interfaces {
        let status = if iface.ip.is_empty() {
            iface.status.as_str()
        } else {
            iface.ip.as_str()
        };
        lines.push(StatusLine::new(iface.display_name(), status));
        if let Some(rate) = rates.get(&iface.name) {
            lines.push(StatusLine::new(
                " ",
                format!("R:{} T:{}", format_rate(rate.rx), format_rate(rate.tx)),
            ));
        }
    }
    StatusTemplate {
        title: "NETWORK".to_string(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{DeviceLink, LinkOptions};
    use crate::test_utils::sample_snapshot;

    #[test]
    fn empty_values_render_label_only() {
        assert_eq!(StatusLine::new("Refresh", "").text(), "Refresh");
        assert_eq!(StatusLine::new("CPU", "12.0%").text(), "CPU: 12.0%");
    }

    #[test]
    fn system_template_skips_missing_fields() {
        let template = system_status_template(&MetricsSnapshot::default());
        assert_eq!(template.title, "PFSENSE STATUS");
        assert!(template.lines.is_empty());

        let template = system_status_template(&sample_snapshot());
        let labels: Vec<&str> = template.lines.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["Host", "Up", "CPU", "Mem", "Load", "IP"]);
    }

    #[test]
    fn network_template_adds_traffic_rows_for_known_rates() {
        let snapshot = sample_snapshot();
        let mut rates = HashMap::new();
        let rate = InterfaceRate {
            tx: 120.0,
            rx: 200.0,
        };
        rates.insert(snapshot.interfaces[0].name.clone(), rate);

        let template = network_status_template(&snapshot, &rates);
        assert_eq!(template.title, "NETWORK");
        assert_eq!(template.lines.len(), snapshot.interfaces.len() + 1);
        assert_eq!(template.lines[1].value, "R:200 B/s T:120 B/s");
    }

    #[tokio::test]
    async fn render_uploads_the_frame() {
        let (link, handle) = DeviceLink::memory(LinkOptions::default());
        let mut display = Display::from_link(link);
        system_status_template(&sample_snapshot()).render(&mut display).await.expect("render");

        assert_eq!(handle.written().len(), 1026);
        // Spacer column of the inverted title stays lit
        assert!(display.frame_buffer().get_pixel(5, 0));
    }
}
