// Mask editor: owns the mask list and turns pointer gestures into
// create / move / resize / delete operations on it.
//
// One gesture = begin_gesture -> update_gesture* -> end_gesture.
// Everything runs synchronously on the UI thread; no operation suspends.

use tracing::debug;

use crate::types::{Point, Rect};

/// Default corner-handle hit tolerance in canvas pixels.
pub const DEFAULT_HANDLE_TOLERANCE: f32 = 6.0;

/// One of the four corners of the selected mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    /// Hit-test order when several corners are within tolerance (tiny masks).
    pub const ALL: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    /// Where this corner sits on `rect`.
    pub fn position(self, rect: &Rect) -> Point {
        match self {
            Handle::TopLeft => rect.top_left(),
            Handle::TopRight => rect.top_right(),
            Handle::BottomLeft => rect.bottom_left(),
            Handle::BottomRight => rect.bottom_right(),
        }
    }

    /// The corner that stays fixed while this one is dragged.
    pub fn opposite(self) -> Handle {
        match self {
            Handle::TopLeft => Handle::BottomRight,
            Handle::TopRight => Handle::BottomLeft,
            Handle::BottomLeft => Handle::TopRight,
            Handle::BottomRight => Handle::TopLeft,
        }
    }

    /// Move this corner of `rect` to `p`, keeping the opposite corner fixed.
    /// Extents may go negative when dragged past the opposite corner.
    pub fn drag(self, rect: &mut Rect, p: Point) {
        let right = rect.x + rect.w;
        let bottom = rect.y + rect.h;
        match self {
            Handle::TopLeft => {
                rect.x = p.x;
                rect.y = p.y;
                rect.w = right - p.x;
                rect.h = bottom - p.y;
            }
            Handle::TopRight => {
                rect.y = p.y;
                rect.w = p.x - rect.x;
                rect.h = bottom - p.y;
            }
            Handle::BottomLeft => {
                rect.x = p.x;
                rect.w = right - p.x;
                rect.h = p.y - rect.y;
            }
            Handle::BottomRight => {
                rect.w = p.x - rect.x;
                rect.h = p.y - rect.y;
            }
        }
    }
}

/// Result of a hit test: which mask, and which handle if a corner was grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub index: usize,
    pub handle: Option<Handle>,
}

/// What the pointer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Idle,
    /// `origin` is the fixed corner, `current` follows the pointer.
    Drawing { origin: Point, current: Point },
    /// `anchor` advances with every move so deltas stay incremental.
    Moving { index: usize, anchor: Point },
    /// The dragged corner follows the pointer absolutely; no anchor needed.
    Resizing { index: usize, handle: Handle },
}

#[derive(Debug, Clone)]
pub struct MaskEditor {
    masks: Vec<Rect>,
    selected: Option<usize>,
    mode: Mode,
    handle_tolerance: f32,
}

impl Default for MaskEditor {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_TOLERANCE)
    }
}

impl MaskEditor {
    pub fn new(handle_tolerance: f32) -> Self {
        Self {
            masks: Vec::new(),
            selected: None,
            mode: Mode::Idle,
            handle_tolerance,
        }
    }

    /// Masks in paint order (last is topmost).
    pub fn masks(&self) -> &[Rect] {
        &self.masks
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_mask(&self) -> Option<&Rect> {
        self.selected.and_then(|i| self.masks.get(i))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == Mode::Idle
    }

    pub fn handle_tolerance(&self) -> f32 {
        self.handle_tolerance
    }

    /// Handle being dragged right now, if any.
    pub fn active_handle(&self) -> Option<Handle> {
        match self.mode {
            Mode::Resizing { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Rectangle being drawn, un-normalized (display only, not yet a mask).
    pub fn preview(&self) -> Option<Rect> {
        match self.mode {
            Mode::Drawing { origin, current } => Some(Rect::new(
                origin.x,
                origin.y,
                current.x - origin.x,
                current.y - origin.y,
            )),
            _ => None,
        }
    }

    /// Which mask is under `p`.
    ///
    /// Corners of the selected mask win first, since handles are painted above
    /// everything. Otherwise the topmost mask whose (inclusive) bounds contain
    /// `p` is returned, without a handle.
    pub fn hit_test(&self, p: Point) -> Option<Hit> {
        if let Some(index) = self.selected {
            if let Some(rect) = self.masks.get(index) {
                let tol = self.handle_tolerance;
                for handle in Handle::ALL {
                    let c = handle.position(rect);
                    if (p.x - c.x).abs() <= tol && (p.y - c.y).abs() <= tol {
                        return Some(Hit { index, handle: Some(handle) });
                    }
                }
            }
        }

        self.masks
            .iter()
            .rposition(|m| m.contains(p))
            .map(|index| Hit { index, handle: None })
    }

    /// Pointer went down at `p`: grab a handle, grab a body, or start drawing.
    pub fn begin_gesture(&mut self, p: Point) {
        if !self.is_idle() {
            debug!(mode = ?self.mode, "abandoning unfinished gesture");
            if let Mode::Resizing { index, .. } = std::mem::replace(&mut self.mode, Mode::Idle) {
                self.finish_resize(index);
            }
        }

        self.mode = match self.hit_test(p) {
            Some(Hit { index, handle: Some(handle) }) => {
                self.selected = Some(index);
                Mode::Resizing { index, handle }
            }
            Some(Hit { index, handle: None }) => {
                self.selected = Some(index);
                Mode::Moving { index, anchor: p }
            }
            None => {
                self.selected = None;
                Mode::Drawing { origin: p, current: p }
            }
        };
        debug!(mode = ?self.mode, "gesture started");
    }

    /// Pointer moved to `p` while a gesture is active. No-op when idle.
    pub fn update_gesture(&mut self, p: Point) {
        match &mut self.mode {
            Mode::Idle => {}
            Mode::Drawing { current, .. } => *current = p,
            Mode::Moving { index, anchor } => {
                if let Some(rect) = self.masks.get_mut(*index) {
                    rect.translate(p.x - anchor.x, p.y - anchor.y);
                }
                *anchor = p;
            }
            Mode::Resizing { index, handle } => {
                if let Some(rect) = self.masks.get_mut(*index) {
                    handle.drag(rect, p);
                }
            }
        }
    }

    /// Pointer released at `p`. Returns the index of a newly drawn mask.
    ///
    /// Degenerate (zero width or height) drawings are kept, like any other.
    pub fn end_gesture(&mut self, p: Point) -> Option<usize> {
        let mode = std::mem::replace(&mut self.mode, Mode::Idle);
        match mode {
            Mode::Idle => None,
            Mode::Drawing { origin, .. } => {
                let rect = Rect::from_points(origin, p);
                self.masks.push(rect);
                let index = self.masks.len() - 1;
                debug!(index, ?rect, "mask drawn");
                Some(index)
            }
            Mode::Moving { index, .. } => {
                debug!(index, "mask moved");
                None
            }
            Mode::Resizing { index, .. } => {
                self.finish_resize(index);
                debug!(index, "mask resized");
                None
            }
        }
    }

    /// A resize may have dragged a corner past its opposite; store it normalized.
    fn finish_resize(&mut self, index: usize) {
        if let Some(rect) = self.masks.get_mut(index) {
            *rect = rect.normalized();
        }
    }

    /// Remove the selected mask. Returns it, or `None` when nothing is selected.
    pub fn delete_selected(&mut self) -> Option<Rect> {
        let index = self.selected.take()?;
        if index >= self.masks.len() {
            return None;
        }
        if matches!(self.mode, Mode::Moving { .. } | Mode::Resizing { .. }) {
            self.mode = Mode::Idle;
        }
        let removed = self.masks.remove(index);
        debug!(index, remaining = self.masks.len(), "mask deleted");
        Some(removed)
    }

    /// Append already-normalized rectangles on top, keeping their order.
    pub fn append<I>(&mut self, rects: I) -> usize
    where
        I: IntoIterator<Item = Rect>,
    {
        let before = self.masks.len();
        self.masks.extend(rects.into_iter().map(|r| r.normalized()));
        self.masks.len() - before
    }

    /// Drop every mask and any gesture in progress.
    pub fn clear(&mut self) {
        self.masks.clear();
        self.selected = None;
        self.mode = Mode::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pt(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    fn drag(editor: &mut MaskEditor, from: Point, to: Point) -> Option<usize> {
        editor.begin_gesture(from);
        editor.update_gesture(to);
        editor.end_gesture(to)
    }

    fn editor_with(rects: &[Rect]) -> MaskEditor {
        let mut editor = MaskEditor::default();
        editor.append(rects.iter().copied());
        editor
    }

    #[test]
    fn drawing_appends_normalized_mask() {
        let mut editor = MaskEditor::default();
        editor.begin_gesture(pt(50.0, 40.0));
        editor.update_gesture(pt(30.0, 35.0));
        assert_eq!(editor.preview(), Some(Rect::new(50.0, 40.0, -20.0, -5.0)));
        editor.update_gesture(pt(10.0, 20.0));

        let index = editor.end_gesture(pt(10.0, 20.0));
        assert_eq!(index, Some(0));
        assert_eq!(editor.masks(), &[Rect::new(10.0, 20.0, 40.0, 20.0)]);
        assert!(editor.masks()[0].is_normalized());
        assert!(editor.is_idle());
        assert_eq!(editor.selected(), None);
        assert_eq!(editor.preview(), None);
    }

    #[test]
    fn drawing_uses_release_point() {
        let mut editor = MaskEditor::default();
        editor.begin_gesture(pt(0.0, 0.0));
        editor.update_gesture(pt(5.0, 5.0));
        editor.end_gesture(pt(8.0, 3.0));
        assert_eq!(editor.masks(), &[Rect::new(0.0, 0.0, 8.0, 3.0)]);
    }

    #[test]
    fn click_without_drag_keeps_degenerate_mask() {
        let mut editor = MaskEditor::default();
        editor.begin_gesture(pt(12.0, 12.0));
        editor.end_gesture(pt(12.0, 12.0));
        assert_eq!(editor.masks().len(), 1);
        assert!(editor.masks()[0].is_degenerate());
    }

    #[test]
    fn hit_test_prefers_topmost() {
        let editor = editor_with(&[
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Rect::new(50.0, 50.0, 100.0, 100.0),
        ]);
        assert_eq!(editor.hit_test(pt(75.0, 75.0)), Some(Hit { index: 1, handle: None }));
        assert_eq!(editor.hit_test(pt(25.0, 25.0)), Some(Hit { index: 0, handle: None }));
        assert_eq!(editor.hit_test(pt(200.0, 25.0)), None);
    }

    #[test]
    fn handles_only_on_selected_mask() {
        let mut editor = editor_with(&[Rect::new(10.0, 10.0, 40.0, 40.0)]);
        // Unselected: the corner is just the body edge.
        assert_eq!(editor.hit_test(pt(10.0, 10.0)), Some(Hit { index: 0, handle: None }));
        // Just outside the corner, not on the body, nothing selected.
        assert_eq!(editor.hit_test(pt(6.0, 6.0)), None);

        drag(&mut editor, pt(30.0, 30.0), pt(30.0, 30.0));
        assert_eq!(editor.selected(), Some(0));
        assert_eq!(
            editor.hit_test(pt(6.0, 6.0)),
            Some(Hit { index: 0, handle: Some(Handle::TopLeft) })
        );
        assert_eq!(
            editor.hit_test(pt(53.0, 47.0)),
            Some(Hit { index: 0, handle: Some(Handle::BottomRight) })
        );
        assert_eq!(
            editor.hit_test(pt(50.0, 10.0)),
            Some(Hit { index: 0, handle: Some(Handle::TopRight) })
        );
        assert_eq!(
            editor.hit_test(pt(10.0, 50.0)),
            Some(Hit { index: 0, handle: Some(Handle::BottomLeft) })
        );
    }

    #[test]
    fn selected_handle_beats_mask_above() {
        let mut editor = editor_with(&[
            Rect::new(0.0, 0.0, 20.0, 20.0),
            Rect::new(15.0, 15.0, 20.0, 20.0),
        ]);
        editor.begin_gesture(pt(5.0, 5.0));
        editor.end_gesture(pt(5.0, 5.0));
        assert_eq!(editor.selected(), Some(0));
        assert_eq!(
            editor.hit_test(pt(20.0, 20.0)),
            Some(Hit { index: 0, handle: Some(Handle::BottomRight) })
        );
    }

    #[test]
    fn begin_on_body_selects_and_moves() {
        let mut editor = editor_with(&[Rect::new(10.0, 10.0, 20.0, 20.0)]);
        editor.begin_gesture(pt(20.0, 20.0));
        assert_eq!(editor.selected(), Some(0));
        assert_eq!(editor.mode(), Mode::Moving { index: 0, anchor: pt(20.0, 20.0) });

        editor.update_gesture(pt(25.0, 18.0));
        editor.update_gesture(pt(30.0, 30.0));
        assert_eq!(editor.masks()[0], Rect::new(20.0, 20.0, 20.0, 20.0));
        assert_eq!(editor.end_gesture(pt(30.0, 30.0)), None);
        assert!(editor.is_idle());
        assert_eq!(editor.selected(), Some(0));
    }

    #[test]
    fn move_there_and_back_restores_origin() {
        let original = Rect::new(17.0, 9.0, 30.0, 12.0);
        let mut editor = editor_with(&[original]);

        drag(&mut editor, pt(30.0, 15.0), pt(43.0, 1.0));
        assert_eq!(editor.masks()[0].x, 30.0);
        assert_eq!(editor.masks()[0].y, -5.0);

        // Grab away from the corners so this is a move, not a resize.
        drag(&mut editor, pt(43.0, 1.0), pt(30.0, 15.0));
        assert_eq!(editor.masks()[0], original);
    }

    #[test]
    fn begin_on_empty_space_clears_selection() {
        let mut editor = editor_with(&[Rect::new(0.0, 0.0, 10.0, 10.0)]);
        drag(&mut editor, pt(5.0, 5.0), pt(5.0, 5.0));
        assert_eq!(editor.selected(), Some(0));

        editor.begin_gesture(pt(80.0, 80.0));
        assert_eq!(editor.selected(), None);
        assert!(matches!(editor.mode(), Mode::Drawing { .. }));
    }

    #[test]
    fn resize_keeps_opposite_corner_fixed() {
        let original = Rect::new(100.0, 100.0, 50.0, 40.0);
        for handle in Handle::ALL {
            let mut editor = editor_with(&[original]);
            editor.begin_gesture(pt(120.0, 120.0));
            editor.end_gesture(pt(120.0, 120.0));

            let grab = handle.position(&original);
            editor.begin_gesture(grab);
            assert_eq!(editor.active_handle(), Some(handle));

            let fixed = handle.opposite().position(&original);
            for (dx, dy) in [(7.0, -3.0), (-12.0, 9.0), (4.0, 4.0)] {
                editor.update_gesture(pt(grab.x + dx, grab.y + dy));
                let now = handle.opposite().position(&editor.masks()[0]);
                assert_eq!(now, fixed, "{handle:?} moved the opposite corner");
            }
            editor.end_gesture(pt(grab.x + 4.0, grab.y + 4.0));
        }
    }

    #[test]
    fn resize_follows_rule_table() {
        let base = Rect::new(10.0, 10.0, 20.0, 20.0);
        let p = pt(14.0, 6.0);
        let cases = [
            (Handle::TopLeft, Rect::new(14.0, 6.0, 16.0, 24.0)),
            (Handle::TopRight, Rect::new(10.0, 6.0, 4.0, 24.0)),
            (Handle::BottomLeft, Rect::new(14.0, 10.0, 16.0, -4.0)),
            (Handle::BottomRight, Rect::new(10.0, 10.0, 4.0, -4.0)),
        ];
        for (handle, expected) in cases {
            let mut rect = base;
            handle.drag(&mut rect, p);
            assert_eq!(rect, expected, "{handle:?}");
        }
    }

    #[test]
    fn resize_past_opposite_corner_normalizes_on_release() {
        let mut editor = editor_with(&[Rect::new(10.0, 10.0, 20.0, 20.0)]);
        drag(&mut editor, pt(15.0, 15.0), pt(15.0, 15.0));

        editor.begin_gesture(pt(30.0, 30.0));
        assert_eq!(editor.active_handle(), Some(Handle::BottomRight));
        editor.update_gesture(pt(0.0, 5.0));
        assert_eq!(editor.masks()[0], Rect::new(10.0, 10.0, -10.0, -5.0));

        editor.end_gesture(pt(0.0, 5.0));
        assert_eq!(editor.masks()[0], Rect::new(0.0, 5.0, 10.0, 5.0));
        assert_eq!(editor.hit_test(pt(5.0, 7.0)).map(|h| h.index), Some(0));
    }

    #[test]
    fn abandoned_resize_still_normalizes() {
        let mut editor = editor_with(&[Rect::new(10.0, 10.0, 20.0, 20.0)]);
        drag(&mut editor, pt(15.0, 15.0), pt(15.0, 15.0));

        editor.begin_gesture(pt(30.0, 30.0));
        editor.update_gesture(pt(0.0, 5.0));
        // Release never arrives; the next press starts a new gesture.
        editor.begin_gesture(pt(200.0, 200.0));
        editor.end_gesture(pt(210.0, 210.0));

        assert_eq!(editor.masks()[0], Rect::new(0.0, 5.0, 10.0, 5.0));
        assert!(editor.masks().iter().all(Rect::is_normalized));
    }

    #[test]
    fn hit_inside_lower_mask_outside_upper() {
        let editor = editor_with(&[
            Rect::new(0.0, 0.0, 50.0, 50.0),
            Rect::new(30.0, 30.0, 50.0, 50.0),
            Rect::new(100.0, 100.0, 10.0, 10.0),
        ]);
        assert_eq!(editor.hit_test(pt(10.0, 10.0)).map(|h| h.index), Some(0));
    }

    #[test]
    fn delete_selected_once() {
        let mut editor = editor_with(&[
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(20.0, 0.0, 10.0, 10.0),
        ]);
        drag(&mut editor, pt(25.0, 5.0), pt(25.0, 5.0));

        assert_eq!(editor.delete_selected(), Some(Rect::new(20.0, 0.0, 10.0, 10.0)));
        assert_eq!(editor.masks().len(), 1);
        assert_eq!(editor.selected(), None);

        assert_eq!(editor.delete_selected(), None);
        assert_eq!(editor.masks().len(), 1);
    }

    #[test]
    fn delete_during_move_ends_gesture() {
        let mut editor = editor_with(&[Rect::new(0.0, 0.0, 10.0, 10.0)]);
        editor.begin_gesture(pt(5.0, 5.0));
        editor.delete_selected();
        assert!(editor.is_idle());
        editor.update_gesture(pt(9.0, 9.0));
        assert!(editor.masks().is_empty());
    }

    #[test]
    fn update_and_end_are_noops_when_idle() {
        let mut editor = editor_with(&[Rect::new(0.0, 0.0, 10.0, 10.0)]);
        editor.update_gesture(pt(3.0, 3.0));
        assert_eq!(editor.end_gesture(pt(3.0, 3.0)), None);
        assert_eq!(editor.masks(), &[Rect::new(0.0, 0.0, 10.0, 10.0)]);
    }

    #[test]
    fn append_keeps_order_on_top() {
        let mut editor = editor_with(&[Rect::new(0.0, 0.0, 1.0, 1.0)]);
        let added = editor.append([Rect::new(5.0, 5.0, 2.0, 2.0), Rect::new(9.0, 9.0, -3.0, 1.0)]);
        assert_eq!(added, 2);
        assert_eq!(
            editor.masks(),
            &[
                Rect::new(0.0, 0.0, 1.0, 1.0),
                Rect::new(5.0, 5.0, 2.0, 2.0),
                Rect::new(6.0, 9.0, 3.0, 1.0),
            ]
        );
    }

    fn whole() -> impl Strategy<Value = f32> {
        (-10_000i32..10_000).prop_map(|v| v as f32)
    }

    fn any_handle() -> impl Strategy<Value = Handle> {
        (0usize..4).prop_map(|i| Handle::ALL[i])
    }

    proptest! {
        #[test]
        fn drawn_mask_is_bounding_box(
            ox in -1.0e4f32..1.0e4, oy in -1.0e4f32..1.0e4,
            path in prop::collection::vec((-1.0e4f32..1.0e4, -1.0e4f32..1.0e4), 0..8),
            fx in -1.0e4f32..1.0e4, fy in -1.0e4f32..1.0e4,
        ) {
            let mut editor = MaskEditor::default();
            editor.begin_gesture(pt(ox, oy));
            for (x, y) in path {
                editor.update_gesture(pt(x, y));
            }
            editor.end_gesture(pt(fx, fy));

            let mask = editor.masks()[0];
            prop_assert!(mask.is_normalized());
            prop_assert_eq!(mask.x, ox.min(fx));
            prop_assert_eq!(mask.y, oy.min(fy));
            prop_assert_eq!(mask.w, (fx - ox).abs());
            prop_assert_eq!(mask.h, (fy - oy).abs());
        }

        #[test]
        fn move_and_back_restores_position(
            x in whole(), y in whole(),
            w in 20i32..400, h in 20i32..400,
            dx in whole(), dy in whole(),
        ) {
            let original = Rect::new(x, y, w as f32, h as f32);
            let mut editor = editor_with(&[original]);
            let grab = pt(x + (w / 2) as f32, y + (h / 2) as f32);
            let halfway = pt(grab.x + (dx / 2.0).trunc(), grab.y + (dy / 2.0).trunc());
            let there = pt(grab.x + dx, grab.y + dy);

            editor.begin_gesture(grab);
            editor.update_gesture(halfway);
            editor.update_gesture(there);
            editor.end_gesture(there);
            prop_assert_eq!(editor.masks()[0].top_left(), pt(x + dx, y + dy));

            editor.begin_gesture(there);
            editor.update_gesture(grab);
            editor.end_gesture(grab);
            prop_assert_eq!(editor.masks()[0], original);
        }

        #[test]
        fn resize_never_moves_opposite_corner(
            x in whole(), y in whole(),
            w in 20i32..400, h in 20i32..400,
            handle in any_handle(),
            path in prop::collection::vec((whole(), whole()), 1..8),
        ) {
            let original = Rect::new(x, y, w as f32, h as f32);
            let mut editor = editor_with(&[original]);
            let centre = pt(x + (w / 2) as f32, y + (h / 2) as f32);
            editor.begin_gesture(centre);
            editor.end_gesture(centre);

            editor.begin_gesture(handle.position(&original));
            prop_assert_eq!(editor.active_handle(), Some(handle));

            let fixed = handle.opposite().position(&original);
            for (px, py) in path {
                editor.update_gesture(pt(px, py));
                prop_assert_eq!(handle.opposite().position(&editor.masks()[0]), fixed);
            }
        }
    }
}
