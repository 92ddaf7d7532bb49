// Core types shared by the editor, the detector and the renderer.

/// A raw RGB raster. This is both the loaded image and the screen we paint into.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the canvas is (pixels)
    pub height: usize,     // how tall the canvas is (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A black canvas of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// A canvas where every pixel is `color`.
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel at (x,y) or `None` when outside the canvas.
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

/// Pack 8-bit channels as 0x00RRGGBB.
#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Split 0x00RRGGBB into its channels.
#[inline]
pub fn unpack_rgb(px: u32) -> (u8, u8, u8) {
    (((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8)
}

/// A position in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas coordinates.
///
/// `w`/`h` may be negative while a gesture is in progress (the rectangle then
/// extends left/up from `x`/`y`). Stored masks are kept normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Bounding box of two points, already normalized.
    /// The min corner is taken as-is from the inputs, so it is exact.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), (b.x - a.x).abs(), (b.y - a.y).abs())
    }

    /// Same area, anchored at the min corner with non-negative extents.
    pub fn normalized(&self) -> Self {
        let (x, w) = if self.w < 0.0 { (self.x + self.w, -self.w) } else { (self.x, self.w) };
        let (y, h) = if self.h < 0.0 { (self.y + self.h, -self.h) } else { (self.y, self.h) };
        Self { x, y, w, h }
    }

    pub fn is_normalized(&self) -> bool {
        self.w >= 0.0 && self.h >= 0.0
    }

    /// Zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.w == 0.0 || self.h == 0.0
    }

    /// Inclusive containment on all four edges.
    pub fn contains(&self, p: Point) -> bool {
        let r = self.normalized();
        p.x >= r.x && p.x <= r.x + r.w && p.y >= r.y && p.y <= r.y + r.h
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.x + self.w, self.y)
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.x, self.y + self.h)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.w, self.y + self.h)
    }

    /// Pixel span covered when rasterizing onto a `width`×`height` canvas:
    /// columns `floor(x)..ceil(x+w)` and rows likewise, clipped.
    pub fn pixel_span(&self, width: usize, height: usize) -> (usize, usize, usize, usize) {
        let r = self.normalized();
        let clip = |v: f32, max: usize| -> usize {
            if v <= 0.0 { 0 } else if v >= max as f32 { max } else { v as usize }
        };
        let x0 = clip(r.x.floor(), width);
        let y0 = clip(r.y.floor(), height);
        let x1 = clip((r.x + r.w).ceil(), width);
        let y1 = clip((r.y + r.h).ceil(), height);
        (x0, y0, x1, y1)
    }
}

/// One pointer transition, derived from the raw mouse state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}
