//! High-level display facade.
//!
//! [`Display`] pairs a [`DeviceLink`] with an in-memory [`FrameBuffer`] and a
//! [`Font`]. Drawing and printing only touch the frame buffer; nothing reaches
//! the panel until [`Display::update`] uploads the whole frame.
//!
//! ```rust
//! use ezio::display::Display;
//! use ezio::link::{DeviceLink, LinkOptions};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ezio::Result<()> {
//! let (link, port) = DeviceLink::memory(LinkOptions::default());
//! let mut display = Display::from_link(link);
//!
//! display.print_line_centered(3, "HELLO");
//! display.update().await?;
//! assert_eq!(port.written().len(), 2 + 1024);
//! # Ok(())
//! # }
//! ```

mod template;

pub use template::{StatusLine, StatusTemplate, network_status_template, system_status_template};

use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::Result;
use crate::font::{self, BuiltinFont, Font};
use crate::framebuffer::{FrameBuffer, HEIGHT, WIDTH};
use crate::link::{DeviceLink, LinkOptions};
use crate::types::{Led, LedColor};

/// A display shared between concurrent activities.
pub type SharedDisplay = Arc<Mutex<Display>>;

/// Frame buffer, font and device link for one panel.
pub struct Display {
    link: DeviceLink,
    fb: FrameBuffer,
    font: Arc<dyn Font>,
}

impl Display {
    /// Open the panel at `path`. The device is not re-initialized; graphics
    /// uploads work without it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, LinkOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: LinkOptions) -> Result<Self> {
        Ok(Self::from_link(DeviceLink::open_with(path, options)?))
    }

    pub fn from_link(link: DeviceLink) -> Self {
        Self {
            link,
            fb: FrameBuffer::new(),
            font: Arc::new(BuiltinFont),
        }
    }

    /// Wrap the display for sharing between tasks.
    pub fn into_shared(self) -> SharedDisplay {
        Arc::new(Mutex::new(self))
    }

    pub async fn close(&mut self) -> Result<()> {
        self.link.close().await
    }

    /// The underlying link, for raw commands.
    pub fn device(&self) -> &DeviceLink {
        &self.link
    }

    pub fn device_mut(&mut self) -> &mut DeviceLink {
        &mut self.link
    }

    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.fb
    }

    pub fn frame_buffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.fb
    }

    pub fn font(&self) -> &dyn Font {
        self.font.as_ref()
    }

    /// Shared handle to the current font.
    pub fn font_handle(&self) -> Arc<dyn Font> {
        Arc::clone(&self.font)
    }

    pub fn set_font(&mut self, font: Arc<dyn Font>) {
        self.font = font;
    }

    /// Clear the frame buffer. The panel keeps showing the last upload.
    pub fn clear(&mut self) {
        self.fb.clear();
    }

    /// Upload the frame buffer to the panel.
    pub async fn update(&mut self) -> Result<()> {
        trace!("Uploading frame ({} lit pixels)", self.fb.lit_count());
        let image = self.fb.encode();
        self.link.upload_image(&image).await
    }

    pub async fn clear_and_update(&mut self) -> Result<()> {
        self.fb.clear();
        self.update().await
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn print(&mut self, x: i32, y: i32, text: &str) {
        font::render_text(&mut self.fb, self.font.as_ref(), x, y, text);
    }

    /// Dark text on a lit box.
    pub fn print_inverted(&mut self, x: i32, y: i32, text: &str) {
        font::render_text_inverted(&mut self.fb, self.font.as_ref(), x, y, text);
    }

    /// Print on text line `line` (line height is the font height).
    pub fn print_line(&mut self, line: i32, text: &str) {
        let y = line * self.font.height();
        self.print(0, y, text);
    }

    pub fn print_line_centered(&mut self, line: i32, text: &str) {
        let y = line * self.font.height();
        let width = font::measure_text(self.font.as_ref(), text);
        self.print(((WIDTH as i32 - width) / 2).max(0), y, text);
    }

    pub fn print_line_right(&mut self, line: i32, text: &str) {
        let y = line * self.font.height();
        let width = font::measure_text(self.font.as_ref(), text);
        self.print((WIDTH as i32 - width).max(0), y, text);
    }

    /// Number of text lines that fit with the current font.
    pub fn max_lines(&self) -> i32 {
        HEIGHT as i32 / self.font.height().max(1)
    }

    /// Set the backlight level and push it out.
    pub async fn set_backlight(&mut self, level: u8) -> Result<()> {
        debug!("Backlight {}", level);
        self.link.set_backlight(level).await?;
        self.link.flush().await
    }

    pub async fn set_led(&mut self, led: Led, color: LedColor) -> Result<()> {
        self.link.set_led(led, color).await
    }

    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        self.fb.draw_line(x1, y1, x2, y2, true);
    }

    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.fb.draw_rect(x, y, w, h, true);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32) {
        self.fb.fill_rect(x, y, w, h, true);
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        self.fb.set_pixel(x, y, on);
    }
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("link", &self.link)
            .field("fb", &self.fb)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::WireImage;
    use crate::link::MemoryPortHandle;
    use std::time::Duration;

    fn display() -> (Display, MemoryPortHandle) {
        let (link, handle) =
            DeviceLink::memory(LinkOptions {
                command_delay: Duration::ZERO,
                dump_payloads: false,
            });
        (Display::from_link(link), handle)
    }

    fn uploaded_frame(handle: &MemoryPortHandle) -> FrameBuffer {
        let written = handle.take_written();
        assert_eq!(&written[..2], &[0x1B, 0x47]);
        let mut bytes = [0u8; WireImage::LEN];
        bytes.copy_from_slice(&written[2..]);
        WireImage::from_bytes(bytes).decode()
    }

    #[tokio::test]
    async fn only_the_latest_frame_is_sent_after_an_outage() {
        let (mut display, handle) = display();
        handle.set_fail_writes(true);
        for n in 0..100 {
            display.clear();
            display.print_line(0, &format!("FRAME {n}"));
            assert!(display.update().await.is_err());
        }
        assert!(display.device().pending().is_empty());

        handle.set_fail_writes(false);
        display.clear();
        display.print_line(0, "BACK");
        display.update().await.expect("update");

        assert_eq!(handle.written().len(), 2 + WireImage::LEN);
        assert_eq!(uploaded_frame(&handle), *display.frame_buffer());
    }

    #[tokio::test]
    async fn printing_stays_local_until_update() {
        let (mut display, handle) = display();
        display.print_line(0, "READY");
        assert!(handle.written().is_empty());

        display.update().await.expect("update");
        let frame = uploaded_frame(&handle);
        assert_eq!(&frame, display.frame_buffer());
        assert!(frame.lit_count() > 0);
    }

    #[tokio::test]
    async fn clear_and_update_uploads_blank_frame() {
        let (mut display, handle) = display();
        display.fill_rect(0, 0, 10, 10);
        display.clear_and_update().await.expect("update");
        assert_eq!(uploaded_frame(&handle).lit_count(), 0);
    }

    #[test]
    fn alignment_helpers_place_text() {
        let (mut display, _handle) = display();
        display.print_line_right(1, "AB");
        // "AB" is 12 px wide, right-aligned against column 127
        assert!((116..128).any(|x| (8..16).any(|y| display.frame_buffer().get_pixel(x, y))));
        assert!(!(0..116).any(|x| (8..16).any(|y| display.frame_buffer().get_pixel(x, y))));

        display.clear();
        display.print_line_centered(0, "AB");
        assert!(!(0..58).any(|x| (0..8).any(|y| display.frame_buffer().get_pixel(x, y))));
        assert!((58..70).any(|x| (0..8).any(|y| display.frame_buffer().get_pixel(x, y))));
    }

    #[test]
    fn builtin_font_fits_eight_lines() {
        let (display, _handle) = display();
        assert_eq!(display.max_lines(), 8);
    }

    #[tokio::test]
    async fn backlight_and_led_reach_the_wire() {
        let (mut display, handle) = display();
        display.set_backlight(128).await.expect("backlight");
        assert_eq!(handle.take_written(), vec![0x1B, 0x42, 0x80]);

        display.set_led(Led::Middle, LedColor::Green).await.expect("led");
        assert_eq!(handle.take_written(), vec![0x1B, 0x4C, 0x30, 0x1B, 0x4C, 0x41]);
    }

    #[tokio::test]
    async fn close_releases_the_link() {
        let (mut display, _handle) = display();
        display.close().await.expect("close");
        assert!(!display.device().is_open());
        assert!(display.update().await.is_err());
    }
}
