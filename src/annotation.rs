//! In-memory annotation graph for a single image.
//!
//! This module provides the core types for HOI annotation:
//! - Labeled bounding boxes with stable identifiers
//! - Directed subject/object interaction relations between boxes
//! - The [`AnnotationSet`] owning both for the currently loaded image
//!
//! Boxes and relations carry opaque ids assigned at creation, so deleting a
//! box never shifts what the remaining relations point at. Display order is
//! insertion order of the box sequence; positions matter only at the
//! persistence boundary (see [`crate::record`]).

use thiserror::Error;

use crate::geometry::{Corner, Point, Rect};

/// Unique identifier for a bounding box within one image.
pub type BoxId = u32;

/// Unique identifier for a relation within one image.
pub type RelationId = u32;

/// The tag string used for person boxes in persisted records.
pub const PERSON_TAG: &str = "person";

/// Semantic label of a bounding box.
///
/// The subject of an interaction is always a person; everything else is an
/// object from the externally configured vocabulary. Keeping this a closed
/// variant makes label-to-color and label-to-behavior dispatch exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Person,
    Object(String),
}

impl Label {
    /// The tag string as written to persisted records.
    pub fn tag(&self) -> &str {
        match self {
            Label::Person => PERSON_TAG,
            Label::Object(name) => name,
        }
    }

    /// Parse a persisted tag string. Unknown object tags are accepted
    /// losslessly; the vocabulary constrains UI choices, not stored data.
    pub fn from_tag(tag: &str) -> Self {
        if tag == PERSON_TAG {
            Label::Person
        } else {
            Label::Object(tag.to_string())
        }
    }

    pub fn is_person(&self) -> bool {
        matches!(self, Label::Person)
    }
}

/// A labeled rectangular region of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    /// Stable identifier, unique within this image.
    pub id: BoxId,
    /// Normalized geometry (x1 <= x2, y1 <= y2).
    pub rect: Rect,
    /// Semantic label.
    pub label: Label,
}

/// A directed, typed interaction edge between two boxes ("HOI triple").
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Stable identifier, unique within this image.
    pub id: RelationId,
    /// The acting box (by convention a person).
    pub subject: BoxId,
    /// The box acted upon.
    pub object: BoxId,
    /// Interaction type from the configured vocabulary.
    pub interaction: String,
}

/// Errors from annotation graph mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotationError {
    /// A box id that does not name a live box.
    #[error("no box with id {0}")]
    UnknownBox(BoxId),

    /// A relation id that does not name a live relation.
    #[error("no relation with id {0}")]
    UnknownRelation(RelationId),

    /// Relations must connect two distinct boxes.
    #[error("relation subject and object must be distinct boxes")]
    SelfRelation,
}

/// All boxes and relations for the currently loaded image.
///
/// Exactly one `AnnotationSet` is live at a time; switching images replaces
/// it wholesale (see [`crate::navigation`]). All mutation goes through the
/// methods here, which maintain the invariant that every relation references
/// two distinct live boxes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSet {
    boxes: Vec<BoundingBox>,
    relations: Vec<Relation>,
    next_box_id: BoxId,
    next_relation_id: RelationId,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Boxes in display order (insertion order).
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    /// Relations in insertion order.
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Get a box by id.
    pub fn get_box(&self, id: BoxId) -> Option<&BoundingBox> {
        self.boxes.iter().find(|b| b.id == id)
    }

    /// Get a relation by id.
    pub fn get_relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == id)
    }

    /// The display position of a box, if it is live.
    pub fn position(&self, id: BoxId) -> Option<usize> {
        self.boxes.iter().position(|b| b.id == id)
    }

    /// The box at a display position.
    pub fn box_at(&self, index: usize) -> Option<&BoundingBox> {
        self.boxes.get(index)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Add a box and return its id.
    pub fn add_box(&mut self, rect: Rect, label: Label) -> BoxId {
        let id = self.next_box_id;
        self.next_box_id += 1;
        self.boxes.push(BoundingBox { id, rect, label });
        id
    }

    /// Remove a box, along with every relation whose subject or object is
    /// that box. Returns the ids of the removed relations so the host can
    /// erase their lines. Later boxes keep their ids; only display positions
    /// shift.
    pub fn remove_box(&mut self, id: BoxId) -> Result<Vec<RelationId>, AnnotationError> {
        let index = self.position(id).ok_or(AnnotationError::UnknownBox(id))?;
        self.boxes.remove(index);

        let mut removed = Vec::new();
        self.relations.retain(|r| {
            if r.subject == id || r.object == id {
                removed.push(r.id);
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    /// Replace a box's geometry.
    pub fn update_box_rect(&mut self, id: BoxId, rect: Rect) -> Result<(), AnnotationError> {
        let b = self
            .boxes
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(AnnotationError::UnknownBox(id))?;
        b.rect = rect;
        Ok(())
    }

    /// Replace a box's label (e.g. after the host's label prompt).
    pub fn update_box_label(&mut self, id: BoxId, label: Label) -> Result<(), AnnotationError> {
        let b = self
            .boxes
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(AnnotationError::UnknownBox(id))?;
        b.label = label;
        Ok(())
    }

    /// Add a relation between two distinct live boxes and return its id.
    ///
    /// A box may participate in any number of relations; no degree bound is
    /// enforced here.
    pub fn add_relation(
        &mut self,
        subject: BoxId,
        object: BoxId,
        interaction: impl Into<String>,
    ) -> Result<RelationId, AnnotationError> {
        if subject == object {
            return Err(AnnotationError::SelfRelation);
        }
        if self.get_box(subject).is_none() {
            return Err(AnnotationError::UnknownBox(subject));
        }
        if self.get_box(object).is_none() {
            return Err(AnnotationError::UnknownBox(object));
        }

        let id = self.next_relation_id;
        self.next_relation_id += 1;
        self.relations.push(Relation {
            id,
            subject,
            object,
            interaction: interaction.into(),
        });
        Ok(id)
    }

    /// Remove a relation by id.
    pub fn remove_relation(&mut self, id: RelationId) -> Result<Relation, AnnotationError> {
        let index = self
            .relations
            .iter()
            .position(|r| r.id == id)
            .ok_or(AnnotationError::UnknownRelation(id))?;
        Ok(self.relations.remove(index))
    }

    /// Remove all relations, returning their ids.
    pub fn clear_relations(&mut self) -> Vec<RelationId> {
        self.relations.drain(..).map(|r| r.id).collect()
    }

    /// Remove all boxes and relations.
    pub fn clear(&mut self) {
        self.boxes.clear();
        self.relations.clear();
    }

    /// Find the first box whose interior contains the point, in display
    /// order.
    pub fn hit_test(&self, p: Point) -> Option<BoxId> {
        self.boxes.iter().find(|b| b.rect.contains(p)).map(|b| b.id)
    }

    /// Find a box corner within `threshold` pixels of the point.
    ///
    /// All boxes are scanned for corner hits before any interior test runs,
    /// so resize takes priority over move even when the pointer is inside
    /// another box.
    pub fn hit_test_corner(&self, p: Point, threshold: i32) -> Option<(BoxId, Corner)> {
        self.boxes
            .iter()
            .find_map(|b| b.rect.nearest_corner(p, threshold).map(|c| (b.id, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
        Rect::from_corners(Point::new(x1, y1), Point::new(x2, y2))
    }

    #[test]
    fn test_label_tag_roundtrip() {
        assert_eq!(Label::from_tag("person"), Label::Person);
        assert_eq!(Label::from_tag("cup"), Label::Object("cup".to_string()));
        assert_eq!(Label::Person.tag(), "person");
        assert_eq!(Label::Object("book".to_string()).tag(), "book");
    }

    #[test]
    fn test_add_box_assigns_stable_ids_in_order() {
        let mut set = AnnotationSet::new();
        let a = set.add_box(rect(0, 0, 10, 10), Label::Person);
        let b = set.add_box(rect(20, 20, 30, 30), Label::Object("cup".into()));
        assert_ne!(a, b);
        assert_eq!(set.position(a), Some(0));
        assert_eq!(set.position(b), Some(1));
    }

    #[test]
    fn test_remove_box_keeps_other_ids() {
        let mut set = AnnotationSet::new();
        let a = set.add_box(rect(0, 0, 10, 10), Label::Person);
        let b = set.add_box(rect(20, 20, 30, 30), Label::Object("cup".into()));
        let c = set.add_box(rect(40, 40, 50, 50), Label::Object("book".into()));

        set.remove_box(b).unwrap();

        // Positions shift, ids do not.
        assert_eq!(set.position(a), Some(0));
        assert_eq!(set.position(c), Some(1));
        assert!(set.get_box(b).is_none());

        // A new box never reuses a removed id.
        let d = set.add_box(rect(0, 0, 1, 1), Label::Person);
        assert_ne!(d, b);
    }

    #[test]
    fn test_remove_box_removes_dependent_relations() {
        let mut set = AnnotationSet::new();
        let person = set.add_box(rect(0, 0, 10, 10), Label::Person);
        let cup = set.add_box(rect(20, 20, 30, 30), Label::Object("cup".into()));
        let book = set.add_box(rect(40, 40, 50, 50), Label::Object("book".into()));

        let r1 = set.add_relation(person, cup, "hold").unwrap();
        let r2 = set.add_relation(person, book, "read").unwrap();

        let removed = set.remove_box(cup).unwrap();
        assert_eq!(removed, vec![r1]);
        assert_eq!(set.relations().len(), 1);
        assert_eq!(set.relations()[0].id, r2);
    }

    #[test]
    fn test_remove_subject_removes_all_its_relations() {
        let mut set = AnnotationSet::new();
        let person = set.add_box(rect(0, 0, 10, 10), Label::Person);
        let cup = set.add_box(rect(20, 20, 30, 30), Label::Object("cup".into()));
        let book = set.add_box(rect(40, 40, 50, 50), Label::Object("book".into()));

        set.add_relation(person, cup, "hold").unwrap();
        set.add_relation(person, book, "read").unwrap();

        let removed = set.remove_box(person).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(set.relations().is_empty());
    }

    #[test]
    fn test_add_relation_rejects_self() {
        let mut set = AnnotationSet::new();
        let a = set.add_box(rect(0, 0, 10, 10), Label::Person);
        assert_eq!(
            set.add_relation(a, a, "hold"),
            Err(AnnotationError::SelfRelation)
        );
    }

    #[test]
    fn test_add_relation_rejects_unknown_boxes() {
        let mut set = AnnotationSet::new();
        let a = set.add_box(rect(0, 0, 10, 10), Label::Person);
        assert_eq!(
            set.add_relation(a, 999, "hold"),
            Err(AnnotationError::UnknownBox(999))
        );
        assert_eq!(
            set.add_relation(999, a, "hold"),
            Err(AnnotationError::UnknownBox(999))
        );
        assert!(set.relations().is_empty());
    }

    #[test]
    fn test_multiple_relations_per_box_allowed() {
        let mut set = AnnotationSet::new();
        let person = set.add_box(rect(0, 0, 10, 10), Label::Person);
        let cup = set.add_box(rect(20, 20, 30, 30), Label::Object("cup".into()));

        set.add_relation(person, cup, "hold").unwrap();
        set.add_relation(person, cup, "drink_with").unwrap();
        assert_eq!(set.relations().len(), 2);
    }

    #[test]
    fn test_remove_relation() {
        let mut set = AnnotationSet::new();
        let person = set.add_box(rect(0, 0, 10, 10), Label::Person);
        let cup = set.add_box(rect(20, 20, 30, 30), Label::Object("cup".into()));
        let r = set.add_relation(person, cup, "hold").unwrap();

        let removed = set.remove_relation(r).unwrap();
        assert_eq!(removed.interaction, "hold");
        assert_eq!(
            set.remove_relation(r),
            Err(AnnotationError::UnknownRelation(r))
        );
    }

    #[test]
    fn test_hit_test_first_match_in_display_order() {
        let mut set = AnnotationSet::new();
        let outer = set.add_box(rect(0, 0, 100, 100), Label::Person);
        let _inner = set.add_box(rect(40, 40, 60, 60), Label::Object("cup".into()));

        // Overlapping interiors resolve to the earliest box in the list.
        assert_eq!(set.hit_test(Point::new(50, 50)), Some(outer));
        assert_eq!(set.hit_test(Point::new(200, 200)), None);
    }

    #[test]
    fn test_hit_test_corner_scans_all_boxes_first() {
        let mut set = AnnotationSet::new();
        let outer = set.add_box(rect(0, 0, 100, 100), Label::Person);
        let inner = set.add_box(rect(40, 40, 60, 60), Label::Object("cup".into()));

        // Pointer is inside `outer`'s interior but on `inner`'s corner.
        let hit = set.hit_test_corner(Point::new(41, 39), 10);
        assert_eq!(hit, Some((inner, Corner::TopLeft)));

        // On `outer`'s own corner the earlier box wins.
        let hit = set.hit_test_corner(Point::new(1, 1), 10);
        assert_eq!(hit, Some((outer, Corner::TopLeft)));
    }

    #[test]
    fn test_clear_relations_reports_ids() {
        let mut set = AnnotationSet::new();
        let person = set.add_box(rect(0, 0, 10, 10), Label::Person);
        let cup = set.add_box(rect(20, 20, 30, 30), Label::Object("cup".into()));
        let r1 = set.add_relation(person, cup, "hold").unwrap();
        let r2 = set.add_relation(person, cup, "drink_with").unwrap();

        assert_eq!(set.clear_relations(), vec![r1, r2]);
        assert!(set.relations().is_empty());
        assert_eq!(set.len(), 2);
    }
}
