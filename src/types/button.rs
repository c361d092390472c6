//! Front-panel button codes

use serde::{Deserialize, Serialize};
use std::fmt;

/// A front-panel button, one-to-one with the byte the display sends when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Button {
    /// No button pressed (idle byte)
    None = 0x00,
    Help = 0x41,
    Left = 0x42,
    Esc = 0x43,
    Up = 0x44,
    Enter = 0x45,
    Down = 0x46,
    Right = 0x47,
}

impl Button {
    /// All buttons that represent an actual press.
    pub const PRESSES: [Button; 7] = [
        Button::Help,
        Button::Left,
        Button::Esc,
        Button::Up,
        Button::Enter,
        Button::Down,
        Button::Right,
    ];

    /// Decode a raw byte. Bytes outside the button table yield `None`.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Button::None),
            0x41 => Some(Button::Help),
            0x42 => Some(Button::Left),
            0x43 => Some(Button::Esc),
            0x44 => Some(Button::Up),
            0x45 => Some(Button::Enter),
            0x46 => Some(Button::Down),
            0x47 => Some(Button::Right),
            _ => None,
        }
    }

    /// Raw byte code for this button.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decode a byte only if it is an actual press.
    pub fn press_from_code(code: u8) -> Option<Self> {
        Self::from_code(code).filter(|button| button.is_press())
    }

    /// Whether this value represents a press rather than the idle code.
    pub fn is_press(self) -> bool {
        self != Button::None
    }

    /// Human readable name.
    pub fn name(self) -> &'static str {
        match self {
            Button::None => "None",
            Button::Help => "Help",
            Button::Left => "Left",
            Button::Esc => "Escape",
            Button::Up => "Up",
            Button::Enter => "Enter",
            Button::Down => "Down",
            Button::Right => "Right",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
