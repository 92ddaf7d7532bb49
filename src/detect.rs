// Region detector: suggests masks by bounding the dark blobs of a small
// grayscale copy of the canvas.
//
// canvas -> mean-of-RGB gray -> resize to grid -> 4-connected flood fill
// over cells strictly below the threshold -> one bounding box per blob,
// scaled back up to canvas coordinates.
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use tracing::debug;

use crate::error::Error;
use crate::types::{FrameBuffer, Rect, unpack_rgb};

/// Cells strictly darker than this (0..255) belong to a region.
pub const DEFAULT_THRESHOLD: u8 = 200;
/// The canvas is squeezed to this many cells on each axis before filling.
pub const DEFAULT_GRID_SIZE: usize = 64;

/// Knobs for one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectOptions {
    pub threshold: u8,
    pub grid_size: usize,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD, grid_size: DEFAULT_GRID_SIZE }
    }
}

/// Row-major grid of grayscale intensities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl GrayGrid {
    /// Wrap `cells` (length must be `width * height`).
    pub fn new(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, Error> {
        if cells.len() != width * height {
            return Err(Error::Detection(format!(
                "grid of {width}x{height} needs {} cells, got {}",
                width * height,
                cells.len()
            )));
        }
        Ok(Self { width, height, cells })
    }

    /// Every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self { width, height, cells: vec![value; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get(y * self.width + x).copied()
    }

    /// Out-of-range writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = value;
        }
    }

    /// Gray (mean of R, G, B) copy of `frame`, resized to `grid_w`×`grid_h`
    /// with a bilinear (triangle) filter.
    pub fn from_frame(frame: &FrameBuffer, grid_w: usize, grid_h: usize) -> Result<Self, Error> {
        if frame.is_empty() {
            return Err(Error::Detection("canvas has no pixels".into()));
        }
        if frame.pixels.len() != frame.width * frame.height {
            return Err(Error::Detection(format!(
                "canvas claims {}x{} but holds {} pixels",
                frame.width,
                frame.height,
                frame.pixels.len()
            )));
        }
        if grid_w == 0 || grid_h == 0 {
            return Err(Error::Detection(format!("grid size {grid_w}x{grid_h} is empty")));
        }

        let gray = GrayImage::from_fn(frame.width as u32, frame.height as u32, |x, y| {
            let px = frame.pixels[y as usize * frame.width + x as usize];
            let (r, g, b) = unpack_rgb(px);
            Luma([((r as u16 + g as u16 + b as u16) / 3) as u8])
        });
        let small = imageops::resize(&gray, grid_w as u32, grid_h as u32, FilterType::Triangle);

        Self::new(grid_w, grid_h, small.into_raw())
    }
}

/// Canvas pixels per grid cell on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridScale {
    pub x: f32,
    pub y: f32,
}

impl GridScale {
    pub const IDENTITY: GridScale = GridScale { x: 1.0, y: 1.0 };

    /// Scale that maps `grid` cells back onto a `canvas_w`×`canvas_h` canvas.
    pub fn between(canvas_w: usize, canvas_h: usize, grid: &GrayGrid) -> Self {
        Self {
            x: canvas_w as f32 / grid.width.max(1) as f32,
            y: canvas_h as f32 / grid.height.max(1) as f32,
        }
    }
}

/// Bounding boxes of the 4-connected components of cells below `threshold`.
///
/// Components come out in the row-major order of their first cell. The fill
/// uses an explicit stack, so memory stays O(W·H) whatever the blob shape.
pub fn detect_regions(grid: &GrayGrid, threshold: u8, scale: GridScale) -> Vec<Rect> {
    let (w, h) = (grid.width, grid.height);
    let dark = |i: usize| grid.cells[i] < threshold;

    let mut visited = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();
    let mut regions = Vec::new();

    for seed in 0..w * h {
        if visited[seed] || !dark(seed) {
            continue;
        }
        visited[seed] = true;
        stack.push(seed);

        let (mut min_x, mut min_y) = (seed % w, seed / w);
        let (mut max_x, mut max_y) = (min_x, min_y);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % w, idx / w);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            // left, right, up, down; never diagonals
            let neighbours = [
                (x > 0).then(|| idx - 1),
                (x + 1 < w).then(|| idx + 1),
                (y > 0).then(|| idx - w),
                (y + 1 < h).then(|| idx + w),
            ];
            for n in neighbours.into_iter().flatten() {
                if !visited[n] && dark(n) {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }

        regions.push(Rect::new(
            min_x as f32 * scale.x,
            min_y as f32 * scale.y,
            (max_x - min_x + 1) as f32 * scale.x,
            (max_y - min_y + 1) as f32 * scale.y,
        ));
    }

    regions
}

/// Full pass over a canvas: build the grid, fill, scale back.
pub fn detect_in_frame(frame: &FrameBuffer, options: DetectOptions) -> Result<Vec<Rect>, Error> {
    let grid = GrayGrid::from_frame(frame, options.grid_size, options.grid_size)?;
    let scale = GridScale::between(frame.width, frame.height, &grid);
    Ok(detect_regions(&grid, options.threshold, scale))
}

/// A detection pass running on its own thread.
///
/// Dropping the job discards its result; the worker's send simply fails.
/// That is how a newer run supersedes an older one.
pub struct DetectionJob {
    id: u64,
    rx: Receiver<Result<Vec<Rect>, Error>>,
}

impl DetectionJob {
    /// Start detecting on a snapshot of `canvas`.
    pub fn spawn(id: u64, canvas: Arc<FrameBuffer>, options: DetectOptions) -> Result<Self, Error> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name(format!("region-detect-{id}"))
            .spawn(move || {
                let started = Instant::now();
                let result = detect_in_frame(&canvas, options);
                debug!(
                    job = id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "detection pass finished"
                );
                // Receiver gone means this run was superseded.
                let _ = tx.send(result);
            })
            .map_err(|e| Error::Detection(format!("spawn worker: {e}")))?;
        Ok(Self { id, rx })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Non-blocking check. `None` while the worker is still busy.
    pub fn try_result(&self) -> Option<Result<Vec<Rect>, Error>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(Error::Detection(
                "worker exited without a result".into(),
            ))),
        }
    }

    /// Block until the worker reports.
    pub fn wait(self) -> Result<Vec<Rect>, Error> {
        self.rx
            .recv()
            .map_err(|_| Error::Detection("worker exited without a result".into()))?
    }
}
