//! Image sequencing and record lifecycle.
//!
//! The [`Navigator`] walks an ordered image list with a 1-based index,
//! holding the live [`AnnotationSet`] for the current image. Every move
//! serializes the live set first, then seeds the next one according to the
//! move policy:
//!
//! - plain prev/next/goto load the target image's own record verbatim
//! - copy-forward seeds from the previous image's just-saved record, for
//!   near-duplicate consecutive frames
//! - relabel seeds box 0 from the target's own record and everything else
//!   from the previous image's record, for redoing one box without redoing
//!   the rest
//!
//! Loads go into a scratch set and are swapped in only on success, so a
//! failed load leaves the previous image's state untouched.

use log::{info, warn};
use thiserror::Error;

use crate::annotation::AnnotationSet;
use crate::record::{ImageRecord, RecordError};
use crate::store::RecordStore;

/// Identity and pixel dimensions of one image in the working set.
///
/// The list order must be stable and deterministic between runs
/// (lexicographic by file name) for indices to stay meaningful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn new(file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            file_name: file_name.into(),
            width,
            height,
        }
    }
}

/// Errors from navigation operations.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// No images were discovered.
    #[error("no images in the working set")]
    EmptyImageSet,

    /// A goto target outside `1..=total`.
    #[error("image index {index} outside 1..={total}")]
    IndexOutOfRange { index: usize, total: usize },

    /// Record load/save failure, propagated to the host.
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Walks the image list, saving the live annotation set before every move.
#[derive(Debug)]
pub struct Navigator<S> {
    store: S,
    images: Vec<ImageInfo>,
    /// 1-based index of the current image.
    current: usize,
    annotations: AnnotationSet,
}

impl<S: RecordStore> Navigator<S> {
    /// Open the working set on its first image, loading any existing record.
    pub fn new(store: S, images: Vec<ImageInfo>) -> Result<Self, NavigationError> {
        if images.is_empty() {
            return Err(NavigationError::EmptyImageSet);
        }
        let mut nav = Self {
            store,
            images,
            current: 1,
            annotations: AnnotationSet::new(),
        };
        nav.annotations = nav.load_verbatim(1)?;
        info!("opened working set with {} images", nav.images.len());
        Ok(nav)
    }

    /// 1-based index of the current image.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.images.len()
    }

    pub fn current_image(&self) -> &ImageInfo {
        &self.images[self.current - 1]
    }

    pub fn images(&self) -> &[ImageInfo] {
        &self.images
    }

    /// The live annotation set for the current image.
    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationSet {
        &mut self.annotations
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Serialize the live set to the store. Saves unconditionally: an empty
    /// record means "reviewed, nothing here" and is worth keeping.
    pub fn save_current(&mut self) -> Result<(), NavigationError> {
        let image = &self.images[self.current - 1];
        let record = ImageRecord::from_annotations(
            &self.annotations,
            &image.file_name,
            image.width,
            image.height,
        );
        self.store.save(&image.file_name, &record)?;
        Ok(())
    }

    /// Move to the previous image, if any. The current record is saved
    /// either way.
    pub fn go_to_previous(&mut self) -> Result<(), NavigationError> {
        self.save_current()?;
        if self.current > 1 {
            let seeded = self.load_verbatim(self.current - 1)?;
            self.current -= 1;
            self.annotations = seeded;
        }
        Ok(())
    }

    /// Move to the next image, if any. The current record is saved either
    /// way.
    pub fn go_to_next(&mut self) -> Result<(), NavigationError> {
        self.save_current()?;
        if self.current < self.total() {
            let seeded = self.load_verbatim(self.current + 1)?;
            self.current += 1;
            self.annotations = seeded;
        }
        Ok(())
    }

    /// Move to the next image, seeding it from the previous image's
    /// just-saved record instead of its own.
    pub fn go_to_next_copying_previous(&mut self) -> Result<(), NavigationError> {
        self.save_current()?;
        if self.current < self.total() {
            let seeded = self.load_verbatim(self.current)?;
            self.current += 1;
            self.annotations = seeded;
            info!(
                "copied {} boxes forward to image {}",
                self.annotations.len(),
                self.current
            );
        }
        Ok(())
    }

    /// Move to the next image, seeding box 0 from that image's own saved
    /// record and boxes 1..N plus relations from the previous image's
    /// record. Whichever record is absent contributes nothing.
    pub fn go_to_next_relabel(&mut self) -> Result<(), NavigationError> {
        self.save_current()?;
        if self.current < self.total() {
            let seeded = self.seed_relabel(self.current, self.current + 1)?;
            self.current += 1;
            self.annotations = seeded;
        }
        Ok(())
    }

    /// Jump directly to a 1-based index. Out-of-range targets are rejected
    /// before anything is saved or loaded.
    pub fn go_to(&mut self, index: usize) -> Result<(), NavigationError> {
        if index < 1 || index > self.total() {
            return Err(NavigationError::IndexOutOfRange {
                index,
                total: self.total(),
            });
        }
        self.save_current()?;
        let seeded = self.load_verbatim(index)?;
        self.current = index;
        self.annotations = seeded;
        Ok(())
    }

    /// Load the record of the image at `index` verbatim, or an empty set if
    /// none exists yet.
    fn load_verbatim(&self, index: usize) -> Result<AnnotationSet, NavigationError> {
        let name = &self.images[index - 1].file_name;
        match self.store.load(name)? {
            Some(record) => Ok(record.to_annotations()?),
            None => Ok(AnnotationSet::new()),
        }
    }

    fn seed_relabel(
        &self,
        prev_index: usize,
        new_index: usize,
    ) -> Result<AnnotationSet, NavigationError> {
        let prev = self.store.load(&self.images[prev_index - 1].file_name)?;
        let own = self.store.load(&self.images[new_index - 1].file_name)?;

        let mut gtboxes = Vec::new();
        let own_first_seeded = match &own {
            Some(record) if !record.gtboxes.is_empty() => {
                gtboxes.push(record.gtboxes[0].clone());
                true
            }
            _ => false,
        };
        if let Some(record) = &prev {
            gtboxes.extend(record.gtboxes.iter().skip(1).cloned());
        }

        // The previous record's relation indices only line up when box 0 was
        // taken from the target's own record; otherwise they would silently
        // retarget shifted boxes, so they are dropped instead.
        let hoi = match (&prev, own_first_seeded) {
            (Some(record), true) => {
                let count = gtboxes.len();
                record
                    .hoi
                    .iter()
                    .filter(|t| {
                        let valid = t.subject_id < count
                            && t.object_id < count
                            && t.subject_id != t.object_id;
                        if !valid {
                            warn!(
                                "dropping relation {} -> {} ({}) during relabel seed",
                                t.subject_id, t.object_id, t.interaction
                            );
                        }
                        valid
                    })
                    .cloned()
                    .collect()
            }
            (Some(record), false) if !record.hoi.is_empty() => {
                warn!(
                    "dropping {} relations during relabel seed: target image has no saved record",
                    record.hoi.len()
                );
                Vec::new()
            }
            _ => Vec::new(),
        };

        let image = &self.images[new_index - 1];
        let record = ImageRecord {
            file_name: image.file_name.clone(),
            height: image.height,
            width: image.width,
            gtboxes,
            hoi,
        };
        Ok(record.to_annotations()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Label;
    use crate::geometry::{Point, Rect};
    use crate::store::MemoryStore;

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
        Rect::from_corners(Point::new(x1, y1), Point::new(x2, y2))
    }

    fn images(n: usize) -> Vec<ImageInfo> {
        (1..=n)
            .map(|i| ImageInfo::new(format!("frame_{i:04}.png"), 640, 480))
            .collect()
    }

    #[test]
    fn test_empty_image_set_is_rejected() {
        assert!(matches!(
            Navigator::new(MemoryStore::new(), Vec::new()),
            Err(NavigationError::EmptyImageSet)
        ));
    }

    #[test]
    fn test_new_loads_existing_record_for_first_image() {
        let mut store = MemoryStore::new();
        let mut set = AnnotationSet::new();
        set.add_box(rect(10, 10, 50, 40), Label::Person);
        let record = ImageRecord::from_annotations(&set, "frame_0001.png", 640, 480);
        store.save("frame_0001.png", &record).unwrap();

        let nav = Navigator::new(store, images(3)).unwrap();
        assert_eq!(nav.current_index(), 1);
        assert_eq!(nav.total(), 3);
        assert_eq!(nav.annotations().len(), 1);
        assert_eq!(nav.annotations().boxes()[0].rect, rect(10, 10, 50, 40));
    }

    #[test]
    fn test_move_saves_current_record_first() {
        let mut nav = Navigator::new(MemoryStore::new(), images(2)).unwrap();
        nav.annotations_mut().add_box(rect(0, 0, 9, 9), Label::Person);

        nav.go_to_next().unwrap();
        assert_eq!(nav.current_index(), 2);
        assert!(nav.annotations().is_empty());

        let saved = nav.store().load("frame_0001.png").unwrap().unwrap();
        assert_eq!(saved.gtboxes.len(), 1);
        assert_eq!(saved.gtboxes[0].tag, "person");
    }

    #[test]
    fn test_next_at_end_saves_but_stays() {
        let mut nav = Navigator::new(MemoryStore::new(), images(1)).unwrap();
        nav.annotations_mut().add_box(rect(0, 0, 9, 9), Label::Person);

        nav.go_to_next().unwrap();
        assert_eq!(nav.current_index(), 1);
        assert!(nav.store().load("frame_0001.png").unwrap().is_some());
    }

    #[test]
    fn test_previous_at_start_stays() {
        let mut nav = Navigator::new(MemoryStore::new(), images(2)).unwrap();
        nav.go_to_previous().unwrap();
        assert_eq!(nav.current_index(), 1);
    }

    #[test]
    fn test_previous_loads_saved_record_verbatim() {
        let mut nav = Navigator::new(MemoryStore::new(), images(2)).unwrap();
        nav.annotations_mut().add_box(rect(5, 5, 25, 25), Label::Object("cup".into()));
        nav.go_to_next().unwrap();
        nav.go_to_previous().unwrap();

        assert_eq!(nav.current_index(), 1);
        assert_eq!(nav.annotations().len(), 1);
        assert_eq!(nav.annotations().boxes()[0].label, Label::Object("cup".into()));
    }

    #[test]
    fn test_go_to_bounds_rejected_without_state_change() {
        let mut nav = Navigator::new(MemoryStore::new(), images(3)).unwrap();
        nav.annotations_mut().add_box(rect(0, 0, 9, 9), Label::Person);

        assert!(matches!(
            nav.go_to(0),
            Err(NavigationError::IndexOutOfRange { index: 0, total: 3 })
        ));
        assert!(matches!(
            nav.go_to(4),
            Err(NavigationError::IndexOutOfRange { index: 4, total: 3 })
        ));
        assert_eq!(nav.current_index(), 1);
        // Rejected before saving.
        assert!(nav.store().load("frame_0001.png").unwrap().is_none());
        assert_eq!(nav.annotations().len(), 1);
    }

    #[test]
    fn test_go_to_jumps_and_saves() {
        let mut nav = Navigator::new(MemoryStore::new(), images(5)).unwrap();
        nav.annotations_mut().add_box(rect(0, 0, 9, 9), Label::Person);

        nav.go_to(4).unwrap();
        assert_eq!(nav.current_index(), 4);
        assert!(nav.annotations().is_empty());
        assert!(nav.store().load("frame_0001.png").unwrap().is_some());
    }

    #[test]
    fn test_copy_forward_seeds_previous_boxes() {
        let mut nav = Navigator::new(MemoryStore::new(), images(2)).unwrap();
        // First box deliberately not a person, so no auto relations appear
        // in the saved record.
        nav.annotations_mut().add_box(rect(10, 10, 30, 30), Label::Object("cup".into()));
        nav.annotations_mut().add_box(rect(50, 50, 80, 90), Label::Object("book".into()));

        nav.go_to_next_copying_previous().unwrap();
        assert_eq!(nav.current_index(), 2);

        let boxes = nav.annotations().boxes();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].rect, rect(10, 10, 30, 30));
        assert_eq!(boxes[0].label, Label::Object("cup".into()));
        assert_eq!(boxes[1].rect, rect(50, 50, 80, 90));
        assert!(nav.annotations().relations().is_empty());
    }

    #[test]
    fn test_copy_forward_copies_relations_too() {
        let mut nav = Navigator::new(MemoryStore::new(), images(2)).unwrap();
        let person = nav.annotations_mut().add_box(rect(0, 0, 20, 40), Label::Person);
        let cup = nav.annotations_mut().add_box(rect(30, 30, 40, 40), Label::Object("cup".into()));
        nav.annotations_mut().add_relation(person, cup, "hold").unwrap();

        nav.go_to_next_copying_previous().unwrap();

        let relations = nav.annotations().relations();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].interaction, "hold");
    }

    #[test]
    fn test_relabel_mixes_own_first_box_with_previous_rest() {
        let mut store = MemoryStore::new();

        // Image 2 already has its own saved record with a corrected person
        // box.
        let mut own = AnnotationSet::new();
        own.add_box(rect(100, 100, 140, 180), Label::Person);
        own.add_box(rect(0, 0, 5, 5), Label::Object("laptop".into()));
        store
            .save(
                "frame_0002.png",
                &ImageRecord::from_annotations(&own, "frame_0002.png", 640, 480),
            )
            .unwrap();

        let mut nav = Navigator::new(store, images(2)).unwrap();
        let person = nav.annotations_mut().add_box(rect(10, 10, 50, 90), Label::Person);
        let cup = nav.annotations_mut().add_box(rect(60, 60, 80, 80), Label::Object("cup".into()));
        nav.annotations_mut().add_relation(person, cup, "hold").unwrap();

        nav.go_to_next_relabel().unwrap();

        let boxes = nav.annotations().boxes();
        assert_eq!(boxes.len(), 2);
        // Box 0 from image 2's own record, box 1 from image 1.
        assert_eq!(boxes[0].rect, rect(100, 100, 140, 180));
        assert_eq!(boxes[0].label, Label::Person);
        assert_eq!(boxes[1].rect, rect(60, 60, 80, 80));
        assert_eq!(boxes[1].label, Label::Object("cup".into()));

        // Relations come from image 1's record.
        let relations = nav.annotations().relations();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].interaction, "hold");
        assert_eq!(nav.annotations().position(relations[0].subject), Some(0));
        assert_eq!(nav.annotations().position(relations[0].object), Some(1));
    }

    #[test]
    fn test_relabel_falls_back_when_target_record_absent() {
        let mut nav = Navigator::new(MemoryStore::new(), images(2)).unwrap();
        let person = nav.annotations_mut().add_box(rect(10, 10, 50, 90), Label::Person);
        let cup = nav.annotations_mut().add_box(rect(60, 60, 80, 80), Label::Object("cup".into()));
        nav.annotations_mut().add_relation(person, cup, "hold").unwrap();

        nav.go_to_next_relabel().unwrap();

        // No own record for image 2: only the previous image's boxes 1..N
        // seed, and the relations are dropped rather than retargeted.
        let boxes = nav.annotations().boxes();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label, Label::Object("cup".into()));
        assert!(nav.annotations().relations().is_empty());
    }

    #[test]
    fn test_failed_load_leaves_state_untouched() {
        /// Store whose record for image 2 is unreadable.
        struct PoisonStore(MemoryStore);

        impl RecordStore for PoisonStore {
            fn load(&self, image_name: &str) -> Result<Option<ImageRecord>, RecordError> {
                if image_name == "frame_0002.png" {
                    Err(RecordError::malformed("corrupt record"))
                } else {
                    self.0.load(image_name)
                }
            }

            fn save(&mut self, image_name: &str, record: &ImageRecord) -> Result<(), RecordError> {
                self.0.save(image_name, record)
            }
        }

        let mut nav = Navigator::new(PoisonStore(MemoryStore::new()), images(2)).unwrap();
        nav.annotations_mut().add_box(rect(0, 0, 9, 9), Label::Person);

        assert!(nav.go_to_next().is_err());
        assert_eq!(nav.current_index(), 1);
        assert_eq!(nav.annotations().len(), 1);
    }

    #[test]
    fn test_saved_record_carries_auto_relations() {
        let mut nav = Navigator::new(MemoryStore::new(), images(2)).unwrap();
        nav.annotations_mut().add_box(rect(0, 0, 20, 40), Label::Person);
        nav.annotations_mut().add_box(rect(30, 30, 40, 40), Label::Object("cup".into()));
        nav.annotations_mut().add_box(rect(50, 50, 60, 60), Label::Object("book".into()));

        nav.save_current().unwrap();

        let record = nav.store().load("frame_0001.png").unwrap().unwrap();
        assert_eq!(record.hoi.len(), 2);
        assert!(record.hoi.iter().all(|t| t.subject_id == 0));
        assert!(record.hoi.iter().all(|t| t.interaction == "no_interaction"));
        assert_eq!(record.hoi[0].object_id, 1);
        assert_eq!(record.hoi[1].object_id, 2);
    }
}
