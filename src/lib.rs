//! Async driver for the EZIO-G500 128x64 serial LCD found on firewall appliances.
//!
//! The crate covers the whole panel: the serial command protocol, an in-memory
//! frame buffer with its wire encoding, text rendering, front-panel buttons and
//! the three bi-color LEDs. On top of that sit a self-refreshing status display
//! fed by host metrics and a button-driven menu.
//!
//! # Features
//!
//! - **Device link**: buffered command writes with per-command pacing and explicit flush
//! - **Graphics**: 1-bit frame buffer, drawing primitives, built-in 5x7 font
//! - **Status engine**: independent refresh, render and rotation tasks over one display
//! - **Menus**: arena-backed menu tree driven by the button stream
//! - **Dry runs**: [`MemoryPort`](link::MemoryPort) stands in for the serial port
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ezio::Ezio;
//!
//! #[tokio::main]
//! async fn main() -> ezio::Result<()> {
//!     let mut display = Ezio::open("/dev/ttyS1")?;
//!     display.print_line_centered(3, "HELLO");
//!     display.update().await?;
//!     display.close().await
//! }
//! ```
//!
//! ## Status display
//!
//! ```rust,no_run
//! use ezio::config::Config;
//! use ezio::providers::SystemMetrics;
//! use ezio::status::StatusEngine;
//! use ezio::Ezio;
//!
//! #[tokio::main]
//! async fn main() -> ezio::Result<()> {
//!     let config = Config::load("/usr/local/etc/ezio.yaml")?;
//!     let display = Ezio::open_config(&config)?.into_shared();
//!     let provider = SystemMetrics::with_descriptions(config.interfaces.clone());
//!     let mut engine = StatusEngine::spawn(display, provider, config.status.clone());
//!     tokio::signal::ctrl_c().await.ok();
//!     engine.stop().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Panel I/O and graphics
pub mod buttons;
pub mod display;
pub mod font;
pub mod framebuffer;
pub mod link;

// Metrics and the applications built on them
pub mod menu;
pub mod provider;
pub mod providers;
pub mod status;

// Core exports
pub use error::*;
pub use types::*;

pub use buttons::{ButtonEvents, ButtonPoller, ButtonSource};
pub use display::{Display, SharedDisplay};
pub use link::{DeviceLink, LinkOptions, MemoryPortHandle};

/// Entry point for opening a panel.
///
/// # Examples
///
/// ## Serial port
/// ```rust,no_run
/// use ezio::Ezio;
///
/// # fn main() -> ezio::Result<()> {
/// let display = Ezio::open("/dev/cuau1")?;
/// # Ok(())
/// # }
/// ```
///
/// ## Without hardware
/// ```rust
/// use ezio::Ezio;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> ezio::Result<()> {
/// let (mut display, port) = Ezio::dry_run(Default::default());
/// display.set_backlight(200).await?;
/// assert_eq!(port.written(), vec![0x1B, 0x42, 0xC8]);
/// # Ok(())
/// # }
/// ```
pub struct Ezio;

impl Ezio {
    /// Open the panel at `path` with default link options.
    ///
    /// # Errors
    ///
    /// Returns [`LcdError::Open`] when the device node is missing or cannot be
    /// opened read/write, and [`LcdError::UnsupportedPlatform`] off Unix.
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Display> {
        Display::open(path)
    }

    /// Open the panel named by the configuration's link section.
    pub fn open_config(config: &config::Config) -> Result<Display> {
        Display::open_with(&config.link.port, config.link.options())
    }

    /// A display over an in-memory port, with a handle for inspecting what
    /// would have been sent and for injecting button presses.
    pub fn dry_run(options: LinkOptions) -> (Display, MemoryPortHandle) {
        let (link, handle) = DeviceLink::memory(options);
        (Display::from_link(link), handle)
    }
}
