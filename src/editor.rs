//! Pointer-driven editing state machine.
//!
//! The [`Editor`] interprets discrete pointer and keyboard events against the
//! current mode and mutates the live [`AnnotationSet`], emitting draw intents
//! to the host's [`RenderSurface`]. Exactly one mode is active at a time;
//! entering a mode resets the previous mode's scratch state. All state lives
//! in this value, not in fields scattered across handlers.
//!
//! Two-click drawing: the first pointer-down anchors the box, motion updates
//! a live preview, the second pointer-down commits. Drag mode is sticky: once
//! toggled on, pointer-downs grab boxes for moving or resizing instead of
//! starting a draw, with corner hits taking precedence over interiors.

use log::debug;

use crate::annotation::{AnnotationError, AnnotationSet, BoxId, Label, RelationId};
use crate::geometry::{Point, Rect};
use crate::render::{Color, RenderSurface, ShapeTag};

/// Default Chebyshev distance within which a pointer-down grabs a box corner.
pub const DEFAULT_RESIZE_THRESHOLD: i32 = 10;

/// How many boxes may be selected for a connection at once.
const MAX_CONNECTION_SELECTION: usize = 2;

/// The active pointer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Waiting for input.
    #[default]
    Idle,
    /// First corner placed, tracking the live preview.
    Drawing { anchor: Point },
    /// Translating a box by pointer deltas.
    Dragging { id: BoxId, last: Point },
    /// Moving one corner of a box; `fixed` is the opposite corner, which
    /// stays put. Rebuilding the rect from `fixed` and the pointer keeps it
    /// normalized even when the pointer crosses over.
    Resizing { id: BoxId, fixed: Point },
}

/// Editing state for the current image.
#[derive(Debug)]
pub struct Editor {
    mode: Mode,
    /// Sticky move/resize mode; pointer events draw new boxes when off.
    drag_mode: bool,
    /// Boxes selected for a connection, in selection order. At most two.
    selection: Vec<BoxId>,
    /// Box chosen in the host's list widget, grabbed directly in drag mode.
    active_box: Option<BoxId>,
    /// Label applied to newly drawn boxes.
    current_label: Label,
    resize_threshold: i32,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            drag_mode: false,
            selection: Vec::new(),
            active_box: None,
            current_label: Label::Person,
            resize_threshold: DEFAULT_RESIZE_THRESHOLD,
        }
    }

    pub fn with_resize_threshold(mut self, threshold: i32) -> Self {
        self.resize_threshold = threshold;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn drag_mode(&self) -> bool {
        self.drag_mode
    }

    pub fn selection(&self) -> &[BoxId] {
        &self.selection
    }

    pub fn current_label(&self) -> &Label {
        &self.current_label
    }

    /// Set the label applied to subsequently drawn boxes.
    pub fn set_current_label(&mut self, label: Label) {
        self.current_label = label;
    }

    /// Mirror the host list widget's selection.
    pub fn set_active_box(&mut self, id: Option<BoxId>) {
        self.active_box = id;
    }

    /// Toggle sticky drag mode. Any in-progress draw is discarded.
    pub fn toggle_drag_mode<R: RenderSurface>(&mut self, surface: &mut R) -> bool {
        self.cancel(surface);
        self.drag_mode = !self.drag_mode;
        debug!("drag mode {}", if self.drag_mode { "on" } else { "off" });
        self.drag_mode
    }

    /// Handle a pointer-down event.
    ///
    /// Returns the id of a newly committed box, so the host can run its
    /// label-confirmation prompt and call [`Editor::set_box_label`].
    pub fn pointer_down<R: RenderSurface>(
        &mut self,
        p: Point,
        set: &mut AnnotationSet,
        surface: &mut R,
    ) -> Option<BoxId> {
        if self.drag_mode {
            self.grab(p, set);
            return None;
        }

        match self.mode {
            Mode::Idle => {
                self.mode = Mode::Drawing { anchor: p };
                None
            }
            Mode::Drawing { anchor } => {
                surface.erase_rect(ShapeTag::Preview);
                let rect = Rect::from_corners(anchor, p);
                let id = set.add_box(rect, self.current_label.clone());
                surface.draw_rect(ShapeTag::Box(id), rect, Color::for_label(&self.current_label));
                self.mode = Mode::Idle;
                debug!("committed box {} at {:?}", id, rect);
                Some(id)
            }
            // Stale drag/resize scratch without drag mode: reset, then anchor.
            Mode::Dragging { .. } | Mode::Resizing { .. } => {
                self.mode = Mode::Drawing { anchor: p };
                None
            }
        }
    }

    fn grab(&mut self, p: Point, set: &AnnotationSet) {
        // Corners of every box take precedence over any interior.
        if let Some((id, corner)) = set.hit_test_corner(p, self.resize_threshold) {
            if let Some(b) = set.get_box(id) {
                self.mode = Mode::Resizing {
                    id,
                    fixed: b.rect.corner(corner.opposite()),
                };
                debug!("resizing box {} from {:?} corner", id, corner);
                return;
            }
        }

        // A host-list selection grabs that box regardless of position.
        if let Some(id) = self.active_box {
            if set.get_box(id).is_some() {
                self.mode = Mode::Dragging { id, last: p };
                return;
            }
        }

        if let Some(id) = set.hit_test(p) {
            self.mode = Mode::Dragging { id, last: p };
            debug!("dragging box {}", id);
        }
    }

    /// Handle pointer motion. Updates the live preview while drawing, or the
    /// grabbed box while dragging/resizing.
    pub fn pointer_move<R: RenderSurface>(
        &mut self,
        p: Point,
        set: &mut AnnotationSet,
        surface: &mut R,
    ) {
        match self.mode {
            Mode::Idle => {}
            Mode::Drawing { anchor } => {
                surface.draw_rect(
                    ShapeTag::Preview,
                    Rect::from_corners(anchor, p),
                    Color::for_label(&self.current_label),
                );
            }
            Mode::Dragging { id, last } => {
                let Some(b) = set.get_box(id) else {
                    self.mode = Mode::Idle;
                    return;
                };
                let rect = b.rect.translated(p.x - last.x, p.y - last.y);
                let color = Color::for_label(&b.label);
                if set.update_box_rect(id, rect).is_ok() {
                    surface.draw_rect(ShapeTag::Box(id), rect, color);
                    self.redraw_relation_lines(id, set, surface);
                    self.mode = Mode::Dragging { id, last: p };
                }
            }
            Mode::Resizing { id, fixed } => {
                let Some(b) = set.get_box(id) else {
                    self.mode = Mode::Idle;
                    return;
                };
                let rect = Rect::from_corners(fixed, p);
                let color = Color::for_label(&b.label);
                if set.update_box_rect(id, rect).is_ok() {
                    surface.draw_rect(ShapeTag::Box(id), rect, color);
                    self.redraw_relation_lines(id, set, surface);
                }
            }
        }
    }

    /// Handle pointer release: commits an in-progress drag or resize and
    /// returns to idle. Drag mode itself stays enabled.
    pub fn pointer_up(&mut self) {
        if matches!(self.mode, Mode::Dragging { .. } | Mode::Resizing { .. }) {
            self.mode = Mode::Idle;
        }
    }

    /// Cancel an in-progress draw (Escape), discarding the preview. No
    /// mutation happens.
    pub fn cancel<R: RenderSurface>(&mut self, surface: &mut R) {
        if matches!(self.mode, Mode::Drawing { .. }) {
            surface.erase_rect(ShapeTag::Preview);
        }
        self.mode = Mode::Idle;
    }

    /// Toggle a box in or out of the connection selection.
    ///
    /// Selecting an already-selected box deselects it. A third selection
    /// while two are held is a no-op. Returns whether the box is selected
    /// afterwards.
    pub fn toggle_selection<R: RenderSurface>(
        &mut self,
        id: BoxId,
        set: &AnnotationSet,
        surface: &mut R,
    ) -> Result<bool, AnnotationError> {
        if set.get_box(id).is_none() {
            return Err(AnnotationError::UnknownBox(id));
        }

        if let Some(pos) = self.selection.iter().position(|&s| s == id) {
            self.selection.remove(pos);
            surface.highlight(ShapeTag::Box(id), false);
            return Ok(false);
        }

        if self.selection.len() == MAX_CONNECTION_SELECTION {
            return Ok(false);
        }

        self.selection.push(id);
        surface.highlight(ShapeTag::Box(id), true);
        Ok(true)
    }

    /// Commit the chosen interaction between the two selected boxes.
    ///
    /// Returns `Ok(None)` when fewer than two boxes are selected. On success
    /// the selection and highlights are cleared and the relation line drawn.
    pub fn commit_relation<R: RenderSurface>(
        &mut self,
        interaction: &str,
        set: &mut AnnotationSet,
        surface: &mut R,
    ) -> Result<Option<RelationId>, AnnotationError> {
        let &[subject, object] = self.selection.as_slice() else {
            return Ok(None);
        };

        let id = set.add_relation(subject, object, interaction)?;
        for sel in self.selection.drain(..) {
            surface.highlight(ShapeTag::Box(sel), false);
        }
        if let (Some(s), Some(o)) = (set.get_box(subject), set.get_box(object)) {
            surface.draw_line(
                ShapeTag::Relation(id),
                s.rect.center(),
                o.rect.center(),
                Color::Yellow,
            );
        }
        self.mode = Mode::Idle;
        debug!("committed relation {} ({} -> {})", id, subject, object);
        Ok(Some(id))
    }

    /// Remove a box and everything that depends on it: its rectangle, its
    /// relation lines, and its spot in the connection selection.
    pub fn remove_box<R: RenderSurface>(
        &mut self,
        id: BoxId,
        set: &mut AnnotationSet,
        surface: &mut R,
    ) -> Result<(), AnnotationError> {
        let removed_relations = set.remove_box(id)?;

        surface.erase_rect(ShapeTag::Box(id));
        for rel in removed_relations {
            surface.erase_line(ShapeTag::Relation(rel));
        }
        self.selection.retain(|&s| s != id);
        if self.active_box == Some(id) {
            self.active_box = None;
        }
        match self.mode {
            Mode::Dragging { id: held, .. } | Mode::Resizing { id: held, .. } if held == id => {
                self.mode = Mode::Idle;
            }
            _ => {}
        }
        Ok(())
    }

    /// Remove a relation and erase its line.
    pub fn remove_relation<R: RenderSurface>(
        &mut self,
        id: RelationId,
        set: &mut AnnotationSet,
        surface: &mut R,
    ) -> Result<(), AnnotationError> {
        set.remove_relation(id)?;
        surface.erase_line(ShapeTag::Relation(id));
        Ok(())
    }

    /// Retroactively change a box's label (from the host's label prompt) and
    /// redraw it in the new color.
    pub fn set_box_label<R: RenderSurface>(
        &mut self,
        id: BoxId,
        label: Label,
        set: &mut AnnotationSet,
        surface: &mut R,
    ) -> Result<(), AnnotationError> {
        set.update_box_label(id, label)?;
        if let Some(b) = set.get_box(id) {
            surface.draw_rect(ShapeTag::Box(id), b.rect, Color::for_label(&b.label));
        }
        Ok(())
    }

    /// Reset transient state for an image switch. Drag mode is sticky and
    /// survives; everything else returns to idle.
    pub fn reset_for_image_switch<R: RenderSurface>(&mut self, surface: &mut R) {
        self.cancel(surface);
        for sel in self.selection.drain(..) {
            surface.highlight(ShapeTag::Box(sel), false);
        }
        self.active_box = None;
    }

    fn redraw_relation_lines<R: RenderSurface>(
        &self,
        id: BoxId,
        set: &AnnotationSet,
        surface: &mut R,
    ) {
        for r in set.relations() {
            if r.subject != id && r.object != id {
                continue;
            }
            if let (Some(s), Some(o)) = (set.get_box(r.subject), set.get_box(r.object)) {
                surface.draw_line(
                    ShapeTag::Relation(r.id),
                    s.rect.center(),
                    o.rect.center(),
                    Color::Yellow,
                );
            }
        }
    }
}
