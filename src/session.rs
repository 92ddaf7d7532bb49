// The editing session: one canvas, its masks, and the detector's suggestions.
//
// This is the invocation surface the window shell drives each frame:
// load_image, pointer_down/move/up, delete_key, run_detection,
// poll_detection, accept_candidates. Without an image every pointer call
// is a no-op.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::detect::{DEFAULT_GRID_SIZE, DEFAULT_THRESHOLD, DetectOptions, DetectionJob};
use crate::draw::paint_composite;
use crate::editor::{DEFAULT_HANDLE_TOLERANCE, Handle, MaskEditor};
use crate::error::Error;
use crate::types::{FrameBuffer, Point, PointerEvent, Rect};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub threshold: u8,
    pub grid_size: usize,
    /// Corner hit tolerance; also the half-size of the painted handle squares.
    pub handle_tolerance: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            grid_size: DEFAULT_GRID_SIZE,
            handle_tolerance: DEFAULT_HANDLE_TOLERANCE,
        }
    }
}

impl SessionOptions {
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions { threshold: self.threshold, grid_size: self.grid_size }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub base: &'a FrameBuffer,
    pub masks: &'a [Rect],
    pub selected: Option<usize>,
    pub active_handle: Option<Handle>,
    /// Un-normalized rectangle being drawn.
    pub preview: Option<Rect>,
    pub candidates: &'a [Rect],
    pub handle_size: f32,
}

pub struct MaskSession {
    canvas: Option<Arc<FrameBuffer>>,
    editor: MaskEditor,
    candidates: Vec<Rect>,
    detection: Option<DetectionJob>,
    next_job: u64,
    options: SessionOptions,
}

impl Default for MaskSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl MaskSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            canvas: None,
            editor: MaskEditor::new(options.handle_tolerance),
            candidates: Vec::new(),
            detection: None,
            next_job: 0,
            options,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Takes effect from the next `run_detection`; a pending run keeps its own.
    pub fn set_threshold(&mut self, threshold: u8) {
        debug!(threshold, "detection threshold changed");
        self.options.threshold = threshold;
    }

    /// Replace the canvas. Masks, candidates and any pending detection go too.
    pub fn load_image(&mut self, frame: FrameBuffer) {
        info!(width = frame.width, height = frame.height, "image loaded");
        self.canvas = Some(Arc::new(frame));
        self.editor.clear();
        self.candidates.clear();
        self.detection = None;
    }

    pub fn has_image(&self) -> bool {
        self.canvas.is_some()
    }

    pub fn canvas(&self) -> Option<&FrameBuffer> {
        self.canvas.as_deref()
    }

    pub fn editor(&self) -> &MaskEditor {
        &self.editor
    }

    pub fn masks(&self) -> &[Rect] {
        self.editor.masks()
    }

    pub fn candidates(&self) -> &[Rect] {
        &self.candidates
    }

    pub fn pointer_down(&mut self, p: Point) {
        if self.has_image() {
            self.editor.begin_gesture(p);
        }
    }

    pub fn pointer_move(&mut self, p: Point) {
        if self.has_image() {
            self.editor.update_gesture(p);
        }
    }

    pub fn pointer_up(&mut self, p: Point) {
        if self.has_image() {
            if let Some(index) = self.editor.end_gesture(p) {
                info!(index, total = self.editor.masks().len(), "mask added");
            }
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(p) => self.pointer_down(p),
            PointerEvent::Move(p) => self.pointer_move(p),
            PointerEvent::Up(p) => self.pointer_up(p),
        }
    }

    /// Remove the selected mask. Returns whether anything was removed.
    pub fn delete_key(&mut self) -> bool {
        match self.editor.delete_selected() {
            Some(rect) => {
                info!(?rect, total = self.editor.masks().len(), "mask removed");
                true
            }
            None => false,
        }
    }

    /// Start a detection pass in the background.
    ///
    /// `Ok(false)` means there is no image to detect on. A run that is still
    /// in flight is superseded: its result will be discarded.
    pub fn run_detection(&mut self) -> Result<bool, Error> {
        let Some(canvas) = self.canvas.clone() else {
            info!("nothing to detect");
            return Ok(false);
        };

        let id = self.next_job;
        self.next_job += 1;
        let job = DetectionJob::spawn(id, canvas, self.options.detect_options())?;
        if let Some(old) = self.detection.replace(job) {
            debug!(superseded = old.id(), by = id, "detection superseded");
        }
        info!(job = id, "detection started");
        Ok(true)
    }

    pub fn detection_running(&self) -> bool {
        self.detection.is_some()
    }

    /// Pick up a finished detection without blocking.
    ///
    /// `None` when nothing is pending or the worker is still busy. On success
    /// the candidate list is replaced and its new length returned.
    pub fn poll_detection(&mut self) -> Option<Result<usize, Error>> {
        let result = self.detection.as_ref()?.try_result()?;
        self.detection = None;
        Some(self.finish_detection(result))
    }

    /// Block until the pending detection (if any) reports.
    pub fn wait_detection(&mut self) -> Option<Result<usize, Error>> {
        let job = self.detection.take()?;
        let result = job.wait();
        Some(self.finish_detection(result))
    }

    fn finish_detection(&mut self, result: Result<Vec<Rect>, Error>) -> Result<usize, Error> {
        match result {
            Ok(rects) => {
                info!(candidates = rects.len(), "detection finished");
                self.candidates = rects;
                Ok(self.candidates.len())
            }
            Err(e) => {
                warn!(error = %e, "detection failed, masks untouched");
                Err(e)
            }
        }
    }

    /// Move every candidate onto the mask list, in order. Returns how many.
    pub fn accept_candidates(&mut self) -> usize {
        if self.candidates.is_empty() {
            return 0;
        }
        let added = self.editor.append(self.candidates.drain(..));
        info!(added, total = self.editor.masks().len(), "candidates accepted");
        added
    }

    /// Current frame description for the renderer, once an image is loaded.
    pub fn scene(&self) -> Option<Scene<'_>> {
        let base = self.canvas.as_deref()?;
        Some(Scene {
            base,
            masks: self.editor.masks(),
            selected: self.editor.selected(),
            active_handle: self.editor.active_handle(),
            preview: self.editor.preview(),
            candidates: &self.candidates,
            handle_size: self.options.handle_tolerance,
        })
    }

    /// The image with every mask filled opaque black, ready for export.
    pub fn composite(&self) -> Option<FrameBuffer> {
        let base = self.canvas.as_deref()?;
        Some(paint_composite(base, self.editor.masks()))
    }
}
