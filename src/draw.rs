// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the image with its masks.
// 2) Opaque mask fills, a red outline + corner handles on the selection,
//    a half-dark preview while drawing and dashed outlines for suggestions.
// 3) A tiny 5x7 bitmap font to render HUD text on top of the image.

use crate::editor::Handle;
use crate::error::Error;
use crate::session::Scene;
use crate::types::{FrameBuffer, Point, PointerEvent, Rect, pack_rgb, unpack_rgb};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub const MASK_COLOR: u32 = 0x00_00_00_00;
pub const SELECTION_COLOR: u32 = 0x00_FF_00_00;
pub const HANDLE_FILL: u32 = 0x00_FF_FF_FF;
pub const HANDLE_BORDER: u32 = 0x00_00_00_00;
pub const ACTIVE_HANDLE_FILL: u32 = 0x00_FF_00_00;
pub const CANDIDATE_COLOR: u32 = 0x00_33_CC_FF;
pub const CROSSHAIR_COLOR: u32 = 0x00_FF_CC_33;

const SELECTION_THICKNESS: i32 = 2;
const DASH_LEN: i32 = 4;
const THRESHOLD_STEP: i16 = 10;

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a window sized to the image.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Mouse position in canvas coordinates (clamped to the window).
    pub fn mouse_pos(&self) -> Option<Point> {
        self.window
            .get_mouse_pos(MouseMode::Clamp)
            .map(|(x, y)| Point::new(x, y))
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// Delete or Backspace: drop the selected mask.
    pub fn delete_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::Delete, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Backspace, KeyRepeat::No)
    }

    /// D: run region detection.
    pub fn d_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::D, KeyRepeat::No)
    }

    /// A: accept the suggested regions as masks.
    pub fn a_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::A, KeyRepeat::No)
    }

    /// S: save the masked image.
    pub fn s_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::S, KeyRepeat::No)
    }

    /// Threshold step from the keyboard: `-` lowers, `=`/`+` raises.
    pub fn threshold_step(&self) -> i16 {
        let mut step = 0;
        if self.window.is_key_pressed(Key::Minus, KeyRepeat::Yes) {
            step -= THRESHOLD_STEP;
        }
        if self.window.is_key_pressed(Key::Equal, KeyRepeat::Yes) {
            step += THRESHOLD_STEP;
        }
        step
    }
}

/// Turns the polled left-button state into down / move / up transitions.
#[derive(Debug, Default, Clone)]
pub struct PointerTracker {
    was_down: bool,
    last: Option<Point>,
}

impl PointerTracker {
    pub fn update(&mut self, down: bool, pos: Option<Point>) -> Option<PointerEvent> {
        match (self.was_down, down) {
            (false, true) => {
                let p = pos?;
                self.was_down = true;
                self.last = Some(p);
                Some(PointerEvent::Down(p))
            }
            (true, true) => {
                let p = pos?;
                if self.last == Some(p) {
                    return None;
                }
                self.last = Some(p);
                Some(PointerEvent::Move(p))
            }
            (true, false) => {
                self.was_down = false;
                let p = pos.or(self.last)?;
                self.last = Some(p);
                Some(PointerEvent::Up(p))
            }
            (false, false) => {
                self.last = pos;
                None
            }
        }
    }
}

/* ---------- Scene painting ---------- */

/// Paint one frame: image, masks, selection, preview, candidates.
pub fn paint_scene(screen: &mut FrameBuffer, scene: &Scene<'_>) {
    screen.clone_from(scene.base);

    for mask in scene.masks {
        fill_rect(screen, mask, MASK_COLOR);
    }

    if let Some(mask) = scene.selected.and_then(|i| scene.masks.get(i)) {
        stroke_rect(screen, mask, SELECTION_THICKNESS, SELECTION_COLOR);
        let hs = scene.handle_size;
        for handle in Handle::ALL {
            let corner = handle.position(mask);
            let square = Rect::new(corner.x - hs, corner.y - hs, hs * 2.0, hs * 2.0);
            // The handle being dragged is filled red.
            let fill = if scene.active_handle == Some(handle) { ACTIVE_HANDLE_FILL } else { HANDLE_FILL };
            fill_rect(screen, &square, fill);
            stroke_rect(screen, &square, 1, HANDLE_BORDER);
        }
    }

    if let Some(preview) = scene.preview {
        darken_rect(screen, &preview);
    }

    for candidate in scene.candidates {
        dashed_rect(screen, candidate, CANDIDATE_COLOR);
    }
}

/// The exported image: `base` with every mask filled opaque.
pub fn paint_composite(base: &FrameBuffer, masks: &[Rect]) -> FrameBuffer {
    let mut out = base.clone();
    for mask in masks {
        fill_rect(&mut out, mask, MASK_COLOR);
    }
    out
}

/// Fill the pixels covered by `rect` (any sign of extents).
pub fn fill_rect(fb: &mut FrameBuffer, rect: &Rect, color: u32) {
    let (x0, y0, x1, y1) = rect.pixel_span(fb.width, fb.height);
    for y in y0..y1 {
        let row = y * fb.width;
        fb.pixels[row + x0..row + x1].fill(color);
    }
}

/// Halve the brightness under `rect` (drawing preview).
pub fn darken_rect(fb: &mut FrameBuffer, rect: &Rect) {
    let (x0, y0, x1, y1) = rect.pixel_span(fb.width, fb.height);
    for y in y0..y1 {
        let row = y * fb.width;
        for pix in &mut fb.pixels[row + x0..row + x1] {
            let (r, g, b) = unpack_rgb(*pix);
            *pix = pack_rgb(r / 2, g / 2, b / 2);
        }
    }
}

/// Edges of `rect` in whole pixels: left, top, right, bottom.
fn pixel_edges(rect: &Rect) -> (i32, i32, i32, i32) {
    let r = rect.normalized();
    (
        r.x.floor() as i32,
        r.y.floor() as i32,
        (r.x + r.w).ceil() as i32,
        (r.y + r.h).ceil() as i32,
    )
}

/// Solid outline growing outward from the rectangle's edges.
pub fn stroke_rect(fb: &mut FrameBuffer, rect: &Rect, thickness: i32, color: u32) {
    let (l, t, r, b) = pixel_edges(rect);
    for i in 0..thickness {
        hline(fb, l - i, r + i, t - i, color, None);
        hline(fb, l - i, r + i, b + i, color, None);
        vline(fb, l - i, t - i, b + i, color, None);
        vline(fb, r + i, t - i, b + i, color, None);
    }
}

/// One-pixel dashed outline.
pub fn dashed_rect(fb: &mut FrameBuffer, rect: &Rect, color: u32) {
    let (l, t, r, b) = pixel_edges(rect);
    hline(fb, l, r, t, color, Some(DASH_LEN));
    hline(fb, l, r, b, color, Some(DASH_LEN));
    vline(fb, l, t, b, color, Some(DASH_LEN));
    vline(fb, r, t, b, color, Some(DASH_LEN));
}

/// Horizontal run x0..=x1 at row y, clipped. `dash` skips every other run of that length.
fn hline(fb: &mut FrameBuffer, x0: i32, x1: i32, y: i32, color: u32, dash: Option<i32>) {
    if y < 0 || y >= fb.height as i32 {
        return;
    }
    let start = x0.max(0);
    let end = x1.min(fb.width as i32 - 1);
    for x in start..=end {
        if dash.is_none_or(|d| ((x - x0) / d) % 2 == 0) {
            put_pixel(fb, x, y, color);
        }
    }
}

/// Vertical run y0..=y1 at column x, clipped.
fn vline(fb: &mut FrameBuffer, x: i32, y0: i32, y1: i32, color: u32, dash: Option<i32>) {
    if x < 0 || x >= fb.width as i32 {
        return;
    }
    let start = y0.max(0);
    let end = y1.min(fb.height as i32 - 1);
    for y in start..=end {
        if dash.is_none_or(|d| ((y - y0) / d) % 2 == 0) {
            put_pixel(fb, x, y, color);
        }
    }
}

/* ---------- Software drawing: pixels, crosshair, tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Draw a thin line between (x0,y0) and (x1,y1) using Bresenham.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
    let (mut x0, mut y0, x1, y1) = (x0, y0, x1, y1);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put_pixel(fb, x0, y0, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Draw a small crosshair centered at (cx,cy).
/// Visual: a "+" shape (with a tiny gap at the center) follows your mouse.
pub fn draw_crosshair(fb: &mut FrameBuffer, cx: i32, cy: i32, size: i32, color: u32) {
    draw_line(fb, cx - size, cy, cx - 2, cy, color);
    draw_line(fb, cx + 2, cy, cx + size, cy, color);
    draw_line(fb, cx, cy - size, cx, cy - 2, color);
    draw_line(fb, cx, cy + 2, cx, cy + size, color);
    put_pixel(fb, cx, cy, color);
}

/* ---------- 5x7 bitmap font (digits, A-Z, a little punctuation) ---------- */

/// Return a 5x7 glyph bitmap. Lowercase is drawn as uppercase.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        '+' => g!(0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y) with a 1-pixel black shadow.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        // Shadow pass: offset by (1,1) in black to improve readability
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    put_pixel(fb, x + rx as i32 + 1, y + ry as i32 + 1, 0x00000000);
                }
            }
        }

        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    put_pixel(fb, x + rx as i32, y + ry as i32, color);
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs, 1-pixel spacing.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6; // 5 pixels glyph width + 1 pixel spacing
    }
}
