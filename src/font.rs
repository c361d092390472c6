//! Bitmap fonts and text rendering onto a [`FrameBuffer`].
//!
//! Glyphs are stored column-major: each byte is one column, bit `n` lighting
//! row `y + n`. The pen advances by the glyph's column count, so spacing is
//! part of the glyph data.

use crate::framebuffer::FrameBuffer;

/// A bitmap font.
pub trait Font: Send + Sync {
    /// Column bytes for `ch`, or `None` when the character is not supported.
    fn glyph(&self, ch: char) -> Option<&[u8]>;

    /// Line height in pixels.
    fn height(&self) -> i32;

    /// Advance width of `ch`, 0 when unsupported.
    fn width(&self, ch: char) -> i32 {
        self.glyph(ch).map_or(0, |glyph| glyph.len() as i32)
    }
}

/// Built-in 5x7 ASCII font with one spacer column and an 8 pixel line height.
///
/// Covers `' '..='_'`; lowercase letters render as uppercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFont;

const FIRST: u32 = 0x20;

#[rustfmt::skip]
static GLYPHS: [[u8; 6]; 64] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // ' '
    [0x00, 0x00, 0x5F, 0x00, 0x00, 0x00], // '!'
    [0x00, 0x07, 0x00, 0x07, 0x00, 0x00], // '"'
    [0x14, 0x7F, 0x14, 0x7F, 0x14, 0x00], // '#'
    [0x24, 0x2A, 0x7F, 0x2A, 0x12, 0x00], // '$'
    [0x23, 0x13, 0x08, 0x64, 0x62, 0x00], // '%'
    [0x36, 0x49, 0x56, 0x20, 0x50, 0x00], // '&'
    [0x00, 0x05, 0x03, 0x00, 0x00, 0x00], // '\''
    [0x00, 0x1C, 0x22, 0x41, 0x00, 0x00], // '('
    [0x00, 0x41, 0x22, 0x1C, 0x00, 0x00], // ')'
    [0x08, 0x2A, 0x1C, 0x2A, 0x08, 0x00], // '*'
    [0x08, 0x08, 0x3E, 0x08, 0x08, 0x00], // '+'
    [0x00, 0x50, 0x30, 0x00, 0x00, 0x00], // ','
    [0x08, 0x08, 0x08, 0x08, 0x08, 0x00], // '-'
    [0x00, 0x60, 0x60, 0x00, 0x00, 0x00], // '.'
    [0x20, 0x10, 0x08, 0x04, 0x02, 0x00], // '/'
    [0x3E, 0x51, 0x49, 0x45, 0x3E, 0x00], // '0'
    [0x00, 0x42, 0x7F, 0x40, 0x00, 0x00], // '1'
    [0x42, 0x61, 0x51, 0x49, 0x46, 0x00], // '2'
    [0x21, 0x41, 0x45, 0x4B, 0x31, 0x00], // '3'
    [0x18, 0x14, 0x12, 0x7F, 0x10, 0x00], // '4'
    [0x27, 0x45, 0x45, 0x45, 0x39, 0x00], // '5'
    [0x3C, 0x4A, 0x49, 0x49, 0x30, 0x00], // '6'
    [0x01, 0x71, 0x09, 0x05, 0x03, 0x00], // '7'
    [0x36, 0x49, 0x49, 0x49, 0x36, 0x00], // '8'
    [0x06, 0x49, 0x49, 0x29, 0x1E, 0x00], // '9'
    [0x00, 0x36, 0x36, 0x00, 0x00, 0x00], // ':'
    [0x00, 0x56, 0x36, 0x00, 0x00, 0x00], // ';'
    [0x08, 0x14, 0x22, 0x41, 0x00, 0x00], // '<'
    [0x14, 0x14, 0x14, 0x14, 0x14, 0x00], // '='
    [0x00, 0x41, 0x22, 0x14, 0x08, 0x00], // '>'
    [0x02, 0x01, 0x51, 0x09, 0x06, 0x00], // '?'
    [0x32, 0x49, 0x79, 0x41, 0x3E, 0x00], // '@'
    [0x7E, 0x11, 0x11, 0x11, 0x7E, 0x00], // 'A'
    [0x7F, 0x49, 0x49, 0x49, 0x36, 0x00], // 'B'
    [0x3E, 0x41, 0x41, 0x41, 0x22, 0x00], // 'C'
    [0x7F, 0x41, 0x41, 0x22, 0x1C, 0x00], // 'D'
    [0x7F, 0x49, 0x49, 0x49, 0x41, 0x00], // 'E'
    [0x7F, 0x09, 0x09, 0x09, 0x01, 0x00], // 'F'
    [0x3E, 0x41, 0x49, 0x49, 0x7A, 0x00], // 'G'
    [0x7F, 0x08, 0x08, 0x08, 0x7F, 0x00], // 'H'
    [0x00, 0x41, 0x7F, 0x41, 0x00, 0x00], // 'I'
    [0x20, 0x40, 0x41, 0x3F, 0x01, 0x00], // 'J'
    [0x7F, 0x08, 0x14, 0x22, 0x41, 0x00], // 'K'
    [0x7F, 0x40, 0x40, 0x40, 0x40, 0x00], // 'L'
    [0x7F, 0x02, 0x0C, 0x02, 0x7F, 0x00], // 'M'
    [0x7F, 0x04, 0x08, 0x10, 0x7F, 0x00], // 'N'
    [0x3E, 0x41, 0x41, 0x41, 0x3E, 0x00], // 'O'
    [0x7F, 0x09, 0x09, 0x09, 0x06, 0x00], // 'P'
    [0x3E, 0x41, 0x51, 0x21, 0x5E, 0x00], // 'Q'
    [0x7F, 0x09, 0x19, 0x29, 0x46, 0x00], // 'R'
    [0x46, 0x49, 0x49, 0x49, 0x31, 0x00], // 'S'
    [0x01, 0x01, 0x7F, 0x01, 0x01, 0x00], // 'T'
    [0x3F, 0x40, 0x40, 0x40, 0x3F, 0x00], // 'U'
    [0x1F, 0x20, 0x40, 0x20, 0x1F, 0x00], // 'V'
    [0x3F, 0x40, 0x38, 0x40, 0x3F, 0x00], // 'W'
    [0x63, 0x14, 0x08, 0x14, 0x63, 0x00], // 'X'
    [0x07, 0x08, 0x70, 0x08, 0x07, 0x00], // 'Y'
    [0x61, 0x51, 0x49, 0x45, 0x43, 0x00], // 'Z'
    [0x00, 0x7F, 0x41, 0x41, 0x00, 0x00], // '['
    [0x02, 0x04, 0x08, 0x10, 0x20, 0x00], // '\\'
    [0x00, 0x41, 0x41, 0x7F, 0x00, 0x00], // ']'
    [0x04, 0x02, 0x01, 0x02, 0x04, 0x00], // '^'
    [0x40, 0x40, 0x40, 0x40, 0x40, 0x00], // '_'
];

impl Font for BuiltinFont {
    fn glyph(&self, ch: char) -> Option<&[u8]> {
        let ch = ch.to_ascii_uppercase();
        let index = (ch as u32).checked_sub(FIRST)? as usize;
        GLYPHS.get(index).map(|glyph| glyph.as_slice())
    }

    fn height(&self) -> i32 {
        8
    }
}

fn draw_glyphs(fb: &mut FrameBuffer, font: &dyn Font, x: i32, y: i32, text: &str, on: bool) -> i32 {
    let mut pen = x;
    for ch in text.chars() {
        let Some(glyph) = font.glyph(ch) else {
            continue;
        };
        for (col, bits) in glyph.iter().enumerate() {
            for bit in 0..8 {
                if bits & (1 << bit) != 0 {
                    fb.set_pixel(pen + col as i32, y + bit, on);
                }
            }
        }
        pen += glyph.len() as i32;
    }
    pen
}

/// Draw `text` with its top-left corner at `(x, y)`. Returns the pen position
/// after the last glyph. Unsupported characters are skipped.
pub fn render_text(fb: &mut FrameBuffer, font: &dyn Font, x: i32, y: i32, text: &str) -> i32 {
    draw_glyphs(fb, font, x, y, text, true)
}

/// Draw `text` as dark glyphs on a lit box sized to the text.
pub fn render_text_inverted(
    fb: &mut FrameBuffer,
    font: &dyn Font,
    x: i32,
    y: i32,
    text: &str,
) -> i32 {
    fb.fill_rect(x, y, measure_text(font, text), font.height(), true);
    draw_glyphs(fb, font, x, y, text, false)
}

/// Clear glyph pixels of `text` without touching the background.
pub fn erase_text(fb: &mut FrameBuffer, font: &dyn Font, x: i32, y: i32, text: &str) -> i32 {
    draw_glyphs(fb, font, x, y, text, false)
}

/// Rendered width of `text` in pixels.
pub fn measure_text(font: &dyn Font, text: &str) -> i32 {
    text.chars().map(|ch| font.width(ch)).sum()
}
