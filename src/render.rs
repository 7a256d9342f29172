//! Drawing contract between the annotation core and the host UI.
//!
//! The core never touches a graphics API. It emits tagged draw and erase
//! intents through [`RenderSurface`]; the host maps tags to whatever shape
//! handles its canvas uses. Drawing with a tag that is already on screen
//! replaces the prior shape, so the core can redraw previews and moved boxes
//! without bookkeeping on the host side.

use crate::annotation::{AnnotationSet, BoxId, Label, RelationId};
use crate::geometry::{Point, Rect};

/// Draw colors the core requests from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Person boxes.
    Red,
    /// Object boxes.
    Blue,
    /// Relation lines.
    Yellow,
}

impl Color {
    /// The color for a box label. Exhaustive over [`Label`].
    pub fn for_label(label: &Label) -> Self {
        match label {
            Label::Person => Color::Red,
            Label::Object(_) => Color::Blue,
        }
    }
}

/// Stable identity of a shape on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTag {
    /// The live preview rectangle of an in-progress draw.
    Preview,
    /// The committed rectangle of a box.
    Box(BoxId),
    /// The center-to-center line of a relation.
    Relation(RelationId),
}

/// Drawing surface implemented by the host UI.
///
/// Draw calls are idempotent by tag: drawing a tag that is already present
/// replaces it. Erasing an absent tag is a no-op.
pub trait RenderSurface {
    fn draw_rect(&mut self, tag: ShapeTag, rect: Rect, color: Color);
    fn erase_rect(&mut self, tag: ShapeTag);
    fn draw_line(&mut self, tag: ShapeTag, from: Point, to: Point, color: Color);
    fn erase_line(&mut self, tag: ShapeTag);
    fn highlight(&mut self, tag: ShapeTag, on: bool);
}

/// Redraw an entire annotation set, typically after an image switch.
pub fn draw_all<R: RenderSurface>(set: &AnnotationSet, surface: &mut R) {
    for b in set.boxes() {
        surface.draw_rect(ShapeTag::Box(b.id), b.rect, Color::for_label(&b.label));
    }
    for r in set.relations() {
        if let (Some(subject), Some(object)) = (set.get_box(r.subject), set.get_box(r.object)) {
            surface.draw_line(
                ShapeTag::Relation(r.id),
                subject.rect.center(),
                object.rect.center(),
                Color::Yellow,
            );
        }
    }
}
