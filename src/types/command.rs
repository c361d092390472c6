//! Protocol commands and their canonical byte encodings

use crate::framebuffer::WireImage;

/// Escape byte that prefixes every multi-byte command.
pub const ESC: u8 = 0x1B;

pub(crate) const INIT: u8 = b'@';
pub(crate) const BACKLIGHT: u8 = b'B';
pub(crate) const UPLOAD: u8 = b'G';
pub(crate) const LED: u8 = b'L';
pub(crate) const SHOW_PAGE: u8 = b'P';
pub(crate) const SAVE_PAGE: u8 = b'S';
pub(crate) const INVERTED: u8 = b'r';
pub(crate) const CURSOR: u8 = b'[';

/// Single-byte clear-screen command.
pub const CLEAR: u8 = 0x0C;

/// Single-byte cursor-home command.
pub const HOME: u8 = 0x0B;

/// Direction byte for `ESC '['` cursor moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorDirection {
    Up,
    Down,
    Right,
    Left,
    /// Top-left corner
    Home,
}

impl CursorDirection {
    pub fn code(self) -> u8 {
        match self {
            CursorDirection::Up => b'A',
            CursorDirection::Down => b'B',
            CursorDirection::Right => b'C',
            CursorDirection::Left => b'D',
            CursorDirection::Home => b'H',
        }
    }
}

/// A display command. Encoding is deterministic and never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Clear,
    Home,
    Backlight(u8),
    UploadImage(Box<WireImage>),
    ShowPage(u8),
    SavePage(u8),
    Inverted(bool),
    MoveCursor(CursorDirection),
    /// Raw LED value: channel sub-code OR-ed with the on/off status bit
    Led(u8),
    RawText(Vec<u8>),
}

impl Command {
    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            Command::Clear | Command::Home => 1,
            Command::Init => 2,
            Command::Backlight(_)
            | Command::ShowPage(_)
            | Command::SavePage(_)
            | Command::Inverted(_)
            | Command::MoveCursor(_)
            | Command::Led(_) => 3,
            Command::UploadImage(_) => 2 + WireImage::LEN,
            Command::RawText(text) => text.len(),
        }
    }

    /// Append the wire bytes of this command to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        match self {
            Command::Init => out.extend_from_slice(&[ESC, INIT]),
            Command::Clear => out.push(CLEAR),
            Command::Home => out.push(HOME),
            Command::Backlight(level) => out.extend_from_slice(&[ESC, BACKLIGHT, *level]),
            Command::UploadImage(image) => {
                out.extend_from_slice(&[ESC, UPLOAD]);
                out.extend_from_slice(image.as_bytes());
            }
            Command::ShowPage(page) => out.extend_from_slice(&[ESC, SHOW_PAGE, *page]),
            Command::SavePage(page) => out.extend_from_slice(&[ESC, SAVE_PAGE, *page]),
            Command::Inverted(on) => out.extend_from_slice(&[ESC, INVERTED, u8::from(*on)]),
            Command::MoveCursor(direction) => {
                out.extend_from_slice(&[ESC, CURSOR, direction.code()])
            }
            Command::Led(value) => out.extend_from_slice(&[ESC, LED, *value]),
            Command::RawText(text) => out.extend_from_slice(text),
        }
    }

    /// Wire bytes of this command.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_encodings() {
        assert_eq!(Command::Backlight(200).encode(), vec![0x1B, 0x42, 0xC8]);
        assert_eq!(Command::Init.encode(), vec![0x1B, 0x40]);
        assert_eq!(Command::Clear.encode(), vec![0x0C]);
        assert_eq!(Command::Home.encode(), vec![0x0B]);
        assert_eq!(Command::ShowPage(3).encode(), vec![0x1B, 0x50, 3]);
        assert_eq!(Command::SavePage(1).encode(), vec![0x1B, 0x53, 1]);
        assert_eq!(Command::Inverted(true).encode(), vec![0x1B, 0x72, 1]);
        assert_eq!(Command::Inverted(false).encode(), vec![0x1B, 0x72, 0]);
        assert_eq!(Command::Led(0x11).encode(), vec![0x1B, 0x4C, 0x11]);
        assert_eq!(Command::RawText(b"hi".to_vec()).encode(), b"hi".to_vec());
    }

    #[test]
    fn cursor_moves_use_ansi_letters() {
        let cases = [
            (CursorDirection::Up, b'A'),
            (CursorDirection::Down, b'B'),
            (CursorDirection::Right, b'C'),
            (CursorDirection::Left, b'D'),
            (CursorDirection::Home, b'H'),
        ];
        for (direction, letter) in cases {
            assert_eq!(Command::MoveCursor(direction).encode(), vec![0x1B, b'[', letter]);
        }
    }

    #[test]
    fn upload_prefixes_the_full_payload() {
        let mut image = WireImage::zeroed();
        image.as_bytes_mut()[0] = 0xAA;
        image.as_bytes_mut()[1023] = 0x55;

        let bytes = Command::UploadImage(Box::new(image)).encode();
        assert_eq!(bytes.len(), 1026);
        assert_eq!(&bytes[..3], &[0x1B, 0x47, 0xAA]);
        assert_eq!(bytes[1025], 0x55);
    }

    #[test]
    fn encoded_len_matches_encoding() {
        let commands = [
            Command::Init,
            Command::Clear,
            Command::Backlight(1),
            Command::MoveCursor(CursorDirection::Left),
            Command::RawText(b"status".to_vec()),
            Command::UploadImage(Box::new(WireImage::zeroed())),
        ];
        for command in commands {
            assert_eq!(command.encode().len(), command.encoded_len(), "{command:?}");
        }
    }
}
