//! Banded wire format used for full-frame uploads.
//!
//! The panel is split into 8 horizontal bands of 8 rows. Each byte is one
//! 8-pixel vertical strip of a single column within a band, bit 0 being the
//! band's top row. The payload carries all bands of the left 64 columns
//! (band-major, column-minor) followed by all bands of the right 64 columns.

use super::{FrameBuffer, HEIGHT, WIDTH};

const BANDS: usize = HEIGHT / 8;
const HALF: usize = WIDTH / 2;

/// The 1024-byte payload of an image upload.
#[derive(Clone, PartialEq, Eq)]
pub struct WireImage([u8; WireImage::LEN]);

impl WireImage {
    /// Payload size in bytes.
    pub const LEN: usize = WIDTH * HEIGHT / 8;

    pub fn zeroed() -> Self {
        Self([0; Self::LEN])
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; Self::LEN] {
        &mut self.0
    }

    /// Payload offset of the strip holding column `x` in `band`.
    pub fn offset(x: usize, band: usize) -> usize {
        let half = x / HALF;
        half * HALF * BANDS + band * HALF + (x % HALF)
    }

    /// Pack a frame buffer into wire order.
    pub fn encode(fb: &FrameBuffer) -> Self {
        let mut out = [0u8; Self::LEN];
        for band in 0..BANDS {
            for x in 0..WIDTH {
                let mut strip = 0u8;
                for bit in 0..8 {
                    if fb.pixels[band * 8 + bit][x] {
                        strip |= 1 << bit;
                    }
                }
                out[Self::offset(x, band)] = strip;
            }
        }
        Self(out)
    }

    /// Unpack wire order into `fb`, overwriting every pixel.
    pub fn decode_into(&self, fb: &mut FrameBuffer) {
        for band in 0..BANDS {
            for x in 0..WIDTH {
                let strip = self.0[Self::offset(x, band)];
                for bit in 0..8 {
                    fb.pixels[band * 8 + bit][x] = strip & (1 << bit) != 0;
                }
            }
        }
    }

    pub fn decode(&self) -> FrameBuffer {
        let mut fb = FrameBuffer::new();
        self.decode_into(&mut fb);
        fb
    }
}

impl Default for WireImage {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for WireImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.0.iter().filter(|b| **b != 0).count();
        f.debug_struct("WireImage")
            .field("len", &Self::LEN)
            .field("non_zero", &lit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn top_left_strip_is_first_byte() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(0, 0, true);
        fb.set_pixel(0, 7, true);

        let image = WireImage::encode(&fb);
        assert_eq!(image.as_bytes()[0], 0b1000_0001);
        assert!(image.as_bytes()[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn right_half_follows_all_left_bands() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(64, 0, true);
        fb.set_pixel(63, 63, true);
        fb.set_pixel(127, 8, true);

        let image = WireImage::encode(&fb);
        let bytes = image.as_bytes();
        assert_eq!(bytes[512], 0x01);
        // column 63, band 7, bottom row
        assert_eq!(bytes[7 * 64 + 63], 0x80);
        // column 127, band 1, top row
        assert_eq!(bytes[512 + 64 + 63], 0x01);
        assert_eq!(bytes.iter().filter(|b| **b != 0).count(), 3);
    }

    #[test]
    fn offsets_cover_the_payload_exactly_once() {
        let mut seen = vec![false; WireImage::LEN];
        for band in 0..BANDS {
            for x in 0..WIDTH {
                let offset = WireImage::offset(x, band);
                assert!(!seen[offset], "offset {offset} visited twice");
                seen[offset] = true;
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(pixels in prop::collection::vec(any::<bool>(), WIDTH * HEIGHT)) {
            let mut fb = FrameBuffer::new();
            for (i, on) in pixels.iter().enumerate() {
                fb.set_pixel((i % WIDTH) as i32, (i / WIDTH) as i32, *on);
            }

            let decoded = WireImage::encode(&fb).decode();
            prop_assert_eq!(decoded, fb);
        }

        #[test]
        fn encode_inverts_decode(bytes in prop::collection::vec(any::<u8>(), WireImage::LEN)) {
            let mut raw = [0u8; WireImage::LEN];
            raw.copy_from_slice(&bytes);
            let image = WireImage::from_bytes(raw);

            prop_assert_eq!(WireImage::encode(&image.decode()), image);
        }
    }
}
