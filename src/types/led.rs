//! Front-panel LED identifiers and colors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::LcdError;

/// Status bit OR-ed into a channel sub-code to switch it on.
pub const LED_ON: u8 = 0x01;

/// Status bit for switching a channel off.
pub const LED_OFF: u8 = 0x00;

/// One of the three bi-color indicators, numbered 1-3 from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Led {
    Top,
    Middle,
    Bottom,
}

impl Led {
    pub const ALL: [Led; 3] = [Led::Top, Led::Middle, Led::Bottom];

    /// Look up an LED by its panel number (1-3).
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Led::Top),
            2 => Some(Led::Middle),
            3 => Some(Led::Bottom),
            _ => None,
        }
    }

    /// Panel number (1-3).
    pub fn number(self) -> u8 {
        match self {
            Led::Top => 1,
            Led::Middle => 2,
            Led::Bottom => 3,
        }
    }

    /// Sub-code of the red channel.
    pub fn red_code(self) -> u8 {
        match self {
            Led::Top => 0x10,
            Led::Middle => 0x30,
            Led::Bottom => 0x50,
        }
    }

    /// Sub-code of the green channel.
    pub fn green_code(self) -> u8 {
        match self {
            Led::Top => 0x20,
            Led::Middle => 0x40,
            Led::Bottom => 0x60,
        }
    }
}

impl fmt::Display for Led {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LED {}", self.number())
    }
}

/// Indicator color. Orange is both channels lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedColor {
    #[default]
    Off,
    Red,
    Green,
    Orange,
}

impl LedColor {
    /// Raw `ESC 'L'` values that realize this color, in send order.
    ///
    /// A channel that ends up dark is always switched off first.
    pub fn raw_values(self, led: Led) -> [u8; 2] {
        let red = led.red_code();
        let green = led.green_code();
        match self {
            LedColor::Off => [red | LED_OFF, green | LED_OFF],
            LedColor::Red => [green | LED_OFF, red | LED_ON],
            LedColor::Green => [red | LED_OFF, green | LED_ON],
            LedColor::Orange => [red | LED_ON, green | LED_ON],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LedColor::Off => "off",
            LedColor::Red => "red",
            LedColor::Green => "green",
            LedColor::Orange => "orange",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LedColor {
    type Err = LcdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(LedColor::Off),
            "red" => Ok(LedColor::Red),
            "green" => Ok(LedColor::Green),
            "orange" => Ok(LedColor::Orange),
            other => Err(LcdError::invalid_argument(format!(
                "unknown color: {} (use off, red, green, orange)",
                other
            ))),
        }
    }
}
