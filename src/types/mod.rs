//! Core value types shared across the driver.
//!
//! ## Overview
//!
//! - [`Button`] maps the single-byte codes the panel sends when a key is pressed
//! - [`Led`] and [`LedColor`] describe the three bi-color indicators
//! - [`Command`] is the protocol command set with its canonical byte encoding
//! - [`MetricsSnapshot`] is the host state rendered by the status screens
//!
//! ## Usage Example
//!
//! ```rust
//! use ezio::types::{Command, Led, LedColor};
//!
//! assert_eq!(Command::Backlight(200).encode(), vec![0x1B, 0x42, 0xC8]);
//!
//! // Orange asserts both channels of the indicator
//! let values = LedColor::Orange.raw_values(Led::Middle);
//! assert_eq!(values, [0x31, 0x41]);
//! ```

mod button;
mod command;
mod led;
mod metrics;

pub use button::Button;
pub use command::{CLEAR, Command, CursorDirection, ESC, HOME};
pub use led::{LED_OFF, LED_ON, Led, LedColor};
pub use metrics::{
    InterfaceMetrics, InterfaceRate, MetricsSnapshot, STATUS_ACTIVE, STATUS_NO_CARRIER,
};
