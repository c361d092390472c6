//! In-memory 128x64 pixel grid with drawing primitives.
//!
//! The frame buffer is pure data: drawing never fails and never performs I/O.
//! Coordinates outside the panel are silently clipped on write and read back as
//! `false`, so callers can draw partially off-screen shapes without bounds checks.
//!
//! ```rust
//! use ezio::framebuffer::{FrameBuffer, WireImage};
//!
//! let mut fb = FrameBuffer::new();
//! fb.draw_rect(0, 0, 128, 64, true);
//! fb.draw_line(0, 0, 127, 63, true);
//! fb.set_pixel(500, -3, true); // clipped
//!
//! let image = WireImage::encode(&fb);
//! assert_eq!(image.decode(), fb);
//! ```

mod wire;

pub use wire::WireImage;

/// Panel width in pixels.
pub const WIDTH: usize = 128;

/// Panel height in pixels.
pub const HEIGHT: usize = 64;

/// Largest radius drawn by walking the circle; larger ones are found by
/// scanning the panel instead.
const WALK_LIMIT: i64 = 1 << 12;

/// Corner of a rectangle, used for quarter-circle arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// 1-bit frame buffer, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub(crate) pixels: [[bool; WIDTH]; HEIGHT],
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [[false; WIDTH]; HEIGHT],
        }
    }

    fn index(x: i32, y: i32) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok().filter(|x| *x < WIDTH)?;
        let y = usize::try_from(y).ok().filter(|y| *y < HEIGHT)?;
        Some((x, y))
    }

    /// Turn every pixel off.
    pub fn clear(&mut self) {
        self.pixels = [[false; WIDTH]; HEIGHT];
    }

    /// Turn every pixel on.
    pub fn fill(&mut self) {
        self.pixels = [[true; WIDTH]; HEIGHT];
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if let Some((x, y)) = Self::index(x, y) {
            self.pixels[y][x] = on;
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> bool {
        Self::index(x, y).is_some_and(|(x, y)| self.pixels[y][x])
    }

    /// Toggle a single pixel.
    pub fn invert(&mut self, x: i32, y: i32) {
        if let Some((x, y)) = Self::index(x, y) {
            self.pixels[y][x] = !self.pixels[y][x];
        }
    }

    pub fn invert_all(&mut self) {
        for row in self.pixels.iter_mut() {
            for pixel in row.iter_mut() {
                *pixel = !*pixel;
            }
        }
    }

    pub fn copy_from(&mut self, other: &FrameBuffer) {
        self.pixels = other.pixels;
    }

    /// Number of lit pixels.
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().flatten().filter(|p| **p).count()
    }

    pub fn encode(&self) -> WireImage {
        WireImage::encode(self)
    }

    pub fn decode(&mut self, image: &WireImage) {
        image.decode_into(self);
    }

    /// Set a pixel given wide coordinates; anything off the panel is dropped.
    fn plot(&mut self, x: i64, y: i64, on: bool) {
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            self.set_pixel(x, y, on);
        }
    }

    /// Clipped horizontal span, endpoints in either order.
    fn span(&mut self, x1: i64, x2: i64, y: i64, on: bool) {
        let Some(y) = usize::try_from(y).ok().filter(|y| *y < HEIGHT) else {
            return;
        };
        let start = x1.min(x2).max(0);
        let end = x1.max(x2).min(WIDTH as i64 - 1);
        for x in start..=end {
            self.pixels[y][x as usize] = on;
        }
    }

    /// Clipped vertical span, endpoints in either order.
    fn column(&mut self, x: i64, y1: i64, y2: i64, on: bool) {
        let Some(x) = usize::try_from(x).ok().filter(|x| *x < WIDTH) else {
            return;
        };
        let start = y1.min(y2).max(0);
        let end = y1.max(y2).min(HEIGHT as i64 - 1);
        for y in start..=end {
            self.pixels[y as usize][x] = on;
        }
    }

    /// Horizontal line between `x1` and `x2` inclusive, in either order.
    pub fn hline(&mut self, x1: i32, x2: i32, y: i32, on: bool) {
        self.span(x1.into(), x2.into(), y.into(), on);
    }

    /// Vertical line between `y1` and `y2` inclusive, in either order.
    pub fn vline(&mut self, x: i32, y1: i32, y2: i32, on: bool) {
        self.column(x.into(), y1.into(), y2.into(), on);
    }

    /// Rectangle outline with its top-left corner at `(x, y)`.
    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, on: bool) {
        if w <= 0 || h <= 0 {
            return;
        }
        let (x, y) = (i64::from(x), i64::from(y));
        let right = x + i64::from(w) - 1;
        let bottom = y + i64::from(h) - 1;
        self.span(x, right, y, on);
        self.span(x, right, bottom, on);
        self.column(x, y, bottom, on);
        self.column(right, y, bottom, on);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, on: bool) {
        if w <= 0 || h <= 0 {
            return;
        }
        let (x, y) = (i64::from(x), i64::from(y));
        let right = x + i64::from(w) - 1;
        let bottom = (y + i64::from(h)).min(HEIGHT as i64);
        for row in y.max(0)..bottom {
            self.span(x, right, row, on);
        }
    }

    /// Bresenham line, endpoints included.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, on: bool) {
        let Some((x1, y1, x2, y2)) = clip_line(x1.into(), y1.into(), x2.into(), y2.into()) else {
            return;
        };
        let dx = (x2 - x1).abs();
        let dy = -(y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x1, y1);

        loop {
            self.plot(x, y, on);
            if x == x2 && y == y2 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Walk one octant of a midpoint circle of radius `r`, yielding `(x, y)` with `x >= y`.
    fn octant(r: i64, mut plot: impl FnMut(i64, i64)) {
        let mut x = r;
        let mut y = 0;
        let mut err = 0;
        while x >= y {
            plot(x, y);
            y += 1;
            err += 1 + 2 * y;
            if 2 * (err - x) + 1 > 0 {
                x -= 1;
                err += 1 - 2 * x;
            }
        }
    }

    /// Panel pixels within half a pixel of the circle around `(cx, cy)` that
    /// `keep` accepts, for radii too large to walk.
    fn scan_ring(&mut self, cx: i64, cy: i64, r: i64, keep: impl Fn(i64, i64) -> bool, on: bool) {
        for py in 0..HEIGHT as i64 {
            for px in 0..WIDTH as i64 {
                let (dx, dy) = (px - cx, py - cy);
                if keep(dx, dy) && ((dx as f64).hypot(dy as f64) - r as f64).abs() < 0.5 {
                    self.plot(px, py, on);
                }
            }
        }
    }

    /// Midpoint circle outline.
    pub fn draw_circle(&mut self, cx: i32, cy: i32, r: i32, on: bool) {
        if r < 0 {
            return;
        }
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(r));
        if r > WALK_LIMIT {
            self.scan_ring(cx, cy, r, |_, _| true, on);
            return;
        }
        Self::octant(r, |x, y| {
            self.plot(cx + x, cy + y, on);
            self.plot(cx + y, cy + x, on);
            self.plot(cx - y, cy + x, on);
            self.plot(cx - x, cy + y, on);
            self.plot(cx - x, cy - y, on);
            self.plot(cx - y, cy - x, on);
            self.plot(cx + y, cy - x, on);
            self.plot(cx + x, cy - y, on);
        });
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: i32, on: bool) {
        if r < 0 {
            return;
        }
        let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(r));
        let radius_sq = i128::from(r) * i128::from(r);
        for y in (cy - r).max(0)..=(cy + r).min(HEIGHT as i64 - 1) {
            for x in (cx - r).max(0)..=(cx + r).min(WIDTH as i64 - 1) {
                let (dx, dy) = (i128::from(x - cx), i128::from(y - cy));
                if dx * dx + dy * dy <= radius_sq {
                    self.plot(x, y, on);
                }
            }
        }
    }

    /// Quarter-circle arc centred on `(cx, cy)` bulging towards `corner`.
    pub fn draw_arc(&mut self, cx: i32, cy: i32, r: i32, corner: Corner, on: bool) {
        if r < 0 {
            return;
        }
        self.arc(cx.into(), cy.into(), r.into(), corner, on);
    }

    fn arc(&mut self, cx: i64, cy: i64, r: i64, corner: Corner, on: bool) {
        let (sx, sy) = match corner {
            Corner::TopLeft => (-1, -1),
            Corner::TopRight => (1, -1),
            Corner::BottomLeft => (-1, 1),
            Corner::BottomRight => (1, 1),
        };
        if r > WALK_LIMIT {
            self.scan_ring(cx, cy, r, |dx, dy| dx * sx >= 0 && dy * sy >= 0, on);
            return;
        }
        Self::octant(r, |x, y| {
            self.plot(cx + sx * x, cy + sy * y, on);
            self.plot(cx + sx * y, cy + sy * x, on);
        });
    }

    /// Rectangle outline with corners rounded to radius `r`.
    pub fn draw_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32, on: bool) {
        if w <= 0 || h <= 0 {
            return;
        }
        let r = i64::from(r.clamp(0, (w.min(h) - 1) / 2));
        let (x, y) = (i64::from(x), i64::from(y));
        let right = x + i64::from(w) - 1;
        let bottom = y + i64::from(h) - 1;

        self.span(x + r, right - r, y, on);
        self.span(x + r, right - r, bottom, on);
        self.column(x, y + r, bottom - r, on);
        self.column(right, y + r, bottom - r, on);

        self.arc(x + r, y + r, r, Corner::TopLeft, on);
        self.arc(right - r, y + r, r, Corner::TopRight, on);
        self.arc(x + r, bottom - r, r, Corner::BottomLeft, on);
        self.arc(right - r, bottom - r, r, Corner::BottomRight, on);
    }

    pub fn fill_round_rect(&mut self, x: i32, y: i32, w: i32, h: i32, r: i32, on: bool) {
        if w <= 0 || h <= 0 {
            return;
        }
        let r = i64::from(r.clamp(0, (w.min(h) - 1) / 2));
        let (x, y) = (i64::from(x), i64::from(y));
        let right = x + i64::from(w) - 1;
        let bottom = y + i64::from(h) - 1;

        if r > WALK_LIMIT {
            // Inside when within r of the nearest point of the inner rectangle
            let radius_sq = i128::from(r) * i128::from(r);
            for py in y.max(0)..=bottom.min(HEIGHT as i64 - 1) {
                for px in x.max(0)..=right.min(WIDTH as i64 - 1) {
                    let dx = i128::from(px - px.clamp(x + r, right - r));
                    let dy = i128::from(py - py.clamp(y + r, bottom - r));
                    if dx * dx + dy * dy <= radius_sq {
                        self.plot(px, py, on);
                    }
                }
            }
            return;
        }

        for row in (y + r).max(0)..=(bottom - r).min(HEIGHT as i64 - 1) {
            self.span(x, right, row, on);
        }
        Self::octant(r, |dx, dy| {
            self.span(x + r - dx, right - r + dx, y + r - dy, on);
            self.span(x + r - dy, right - r + dy, y + r - dx, on);
            self.span(x + r - dx, right - r + dx, bottom - r + dy, on);
            self.span(x + r - dy, right - r + dy, bottom - r + dx, on);
        });
    }

    pub fn draw_triangle(
        &mut self,
        (x1, y1): (i32, i32),
        (x2, y2): (i32, i32),
        (x3, y3): (i32, i32),
        on: bool,
    ) {
        self.draw_line(x1, y1, x2, y2, on);
        self.draw_line(x2, y2, x3, y3, on);
        self.draw_line(x3, y3, x1, y1, on);
    }
}

/// Clip a line whose endpoints lie far off the panel to the panel bounds
/// (Liang-Barsky). Lines near the panel pass through untouched. `None` when
/// the line misses the panel.
fn clip_line(x1: i64, y1: i64, x2: i64, y2: i64) -> Option<(i64, i64, i64, i64)> {
    let near = |v: i64| (-WALK_LIMIT..=WALK_LIMIT).contains(&v);
    if [x1, y1, x2, y2].into_iter().all(near) {
        return Some((x1, y1, x2, y2));
    }

    let (fx, fy) = (x1 as f64, y1 as f64);
    let (dx, dy) = ((x2 - x1) as f64, (y2 - y1) as f64);
    let max_x = (WIDTH - 1) as f64;
    let max_y = (HEIGHT - 1) as f64;
    let (mut enter, mut exit) = (0.0f64, 1.0f64);
    for (p, q) in [(-dx, fx), (dx, max_x - fx), (-dy, fy), (dy, max_y - fy)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return None;
        }
    }

    let at = |t: f64| ((fx + t * dx).round() as i64, (fy + t * dy).round() as i64);
    let (ax, ay) = at(enter);
    let (bx, by) = at(exit);
    Some((ax, ay, bx, by))
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &WIDTH)
            .field("height", &HEIGHT)
            .field("lit", &self.lit_count())
            .finish()
    }
}
