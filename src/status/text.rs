//! Formatting and small drawing helpers shared by the status screens.

use std::time::Duration;

use crate::framebuffer::FrameBuffer;

/// Blank columns appended before a scrolling string wraps around.
const SCROLL_GAP: &str = "    ";

/// Frames a long string is held still before it starts scrolling.
pub const SCROLL_PAUSE_FRAMES: u64 = 20;

/// Frames spent on each character while scrolling.
pub const SCROLL_FRAMES_PER_CHAR: u64 = 5;

/// The `max_len`-character window of `text` to show at `frame`.
///
/// Strings that fit are returned unchanged. Longer strings pause on their head,
/// then scroll one character every [`SCROLL_FRAMES_PER_CHAR`] frames and wrap
/// through a short gap.
pub fn scroll_text(text: &str, max_len: usize, frame: u64) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }

    let padded: Vec<char> = chars.iter().copied().chain(SCROLL_GAP.chars()).collect();
    let len = padded.len() as u64;
    let cycle = len * SCROLL_FRAMES_PER_CHAR + SCROLL_PAUSE_FRAMES;
    let phase = frame % cycle;

    if phase < SCROLL_PAUSE_FRAMES {
        return chars[..max_len].iter().collect();
    }

    let pos = ((phase - SCROLL_PAUSE_FRAMES) / SCROLL_FRAMES_PER_CHAR) % len;
    (0..max_len as u64).map(|i| padded[((pos + i) % len) as usize]).collect()
}

/// Human-readable transfer rate in 1024-based units.
pub fn format_rate(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    if bytes_per_sec < KIB {
        format!("{:.0} B/s", bytes_per_sec)
    } else if bytes_per_sec < KIB * KIB {
        format!("{:.1} KB/s", bytes_per_sec / KIB)
    } else {
        format!("{:.1} MB/s", bytes_per_sec / KIB / KIB)
    }
}

/// Human-readable byte count in 1024-based units.
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    let prefix = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}B", bytes as f64 / div as f64, prefix)
}

/// Compact uptime: `Xd Yh`, `Xh Ym` or `Xm`.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let hours = secs / 3600 % 24;
    let mins = secs / 60 % 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}m", mins)
    }
}

/// Uptime with seconds, as `XdHH:MM:SS`.
pub fn format_clock(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}d{:02}:{:02}:{:02}", secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60)
}

/// Bordered gauge filled in proportion to `percent` (clamped to 0..=100).
pub fn draw_bar(fb: &mut FrameBuffer, x: i32, y: i32, w: i32, h: i32, percent: f64) {
    let percent = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    fb.draw_rect(x, y, w, h, true);
    let fill = (f64::from(w - 2) * percent / 100.0) as i32;
    if fill > 0 {
        fb.fill_rect(x + 1, y + 1, fill, h - 2, true);
    }
}
