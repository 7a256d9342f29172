//! Persisted per-image record format.
//!
//! One JSON record is written per image:
//!
//! ```json
//! {
//!   "file_name": "frame_0001.png",
//!   "height": 480,
//!   "width": 640,
//!   "gtboxes": [{"tag": "person", "box": [10, 10, 41, 31]}],
//!   "hoi": [{"subject_id": 0, "object_id": 1, "interaction": "hold"}]
//! }
//! ```
//!
//! Boxes are stored as origin plus inclusive extent (`w = x2 - x1 + 1`), and
//! relations reference box positions within the same record. Both are
//! translated to the id-keyed in-memory model on load and back on save;
//! validation happens here, never silently coerced.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::{AnnotationSet, Label};
use crate::geometry::Rect;

/// Interaction tag emitted by the auto-relation save policy.
pub const NO_INTERACTION: &str = "no_interaction";

/// Errors that can occur reading or writing records.
#[derive(Error, Debug)]
pub enum RecordError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record present but structurally invalid
    #[error("malformed record: {message}")]
    Malformed {
        /// Description of what was wrong
        message: String,
    },
}

impl RecordError {
    /// Create a malformed-record error with a message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// One labeled box as stored on disk: tag plus `[x_min, y_min, width, height]`
/// with inclusive extents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GtBox {
    pub tag: String,
    #[serde(rename = "box")]
    pub bounds: [i32; 4],
}

/// One relation triple as stored on disk, referencing box positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoiTriple {
    pub subject_id: usize,
    pub object_id: usize,
    pub interaction: String,
}

/// The persisted record for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub file_name: String,
    pub height: u32,
    pub width: u32,
    pub gtboxes: Vec<GtBox>,
    pub hoi: Vec<HoiTriple>,
}

impl ImageRecord {
    /// Build the record to persist for an annotation set.
    ///
    /// Applies the auto-relation policy: when the set has zero explicit
    /// relations and its first box is a person, a `no_interaction` triple is
    /// emitted from box 0 to every other box, so skipping relation drawing
    /// for the common case still produces a complete relation set.
    pub fn from_annotations(
        set: &AnnotationSet,
        file_name: &str,
        width: u32,
        height: u32,
    ) -> Self {
        let gtboxes = set
            .boxes()
            .iter()
            .map(|b| GtBox {
                tag: b.label.tag().to_string(),
                bounds: [b.rect.x1, b.rect.y1, b.rect.width(), b.rect.height()],
            })
            .collect();

        let hoi = if set.relations().is_empty() {
            auto_relations(set)
        } else {
            set.relations()
                .iter()
                .filter_map(|r| {
                    match (set.position(r.subject), set.position(r.object)) {
                        (Some(subject_id), Some(object_id)) => Some(HoiTriple {
                            subject_id,
                            object_id,
                            interaction: r.interaction.clone(),
                        }),
                        // Unreachable while AnnotationSet upholds its
                        // invariant; surfaced rather than written dangling.
                        _ => {
                            log::warn!(
                                "relation {} references a missing box, not persisted",
                                r.id
                            );
                            None
                        }
                    }
                })
                .collect()
        };

        Self {
            file_name: file_name.to_string(),
            height,
            width,
            gtboxes,
            hoi,
        }
    }

    /// Reconstitute the in-memory annotation set.
    ///
    /// Fails with [`RecordError::Malformed`] on non-positive box extents,
    /// out-of-range relation indices, or a relation whose subject and object
    /// coincide. A failed load leaves nothing partially applied.
    pub fn to_annotations(&self) -> Result<AnnotationSet, RecordError> {
        let mut set = AnnotationSet::new();
        let mut ids = Vec::with_capacity(self.gtboxes.len());

        for (index, gtbox) in self.gtboxes.iter().enumerate() {
            let [x, y, w, h] = gtbox.bounds;
            if w < 1 || h < 1 {
                return Err(RecordError::malformed(format!(
                    "gtbox {index} has non-positive extent {w}x{h}"
                )));
            }
            let rect = Rect {
                x1: x,
                y1: y,
                x2: x + w - 1,
                y2: y + h - 1,
            };
            ids.push(set.add_box(rect, Label::from_tag(&gtbox.tag)));
        }

        for (index, triple) in self.hoi.iter().enumerate() {
            let subject = *ids.get(triple.subject_id).ok_or_else(|| {
                RecordError::malformed(format!(
                    "hoi {index} subject_id {} out of range ({} boxes)",
                    triple.subject_id,
                    ids.len()
                ))
            })?;
            let object = *ids.get(triple.object_id).ok_or_else(|| {
                RecordError::malformed(format!(
                    "hoi {index} object_id {} out of range ({} boxes)",
                    triple.object_id,
                    ids.len()
                ))
            })?;
            set.add_relation(subject, object, triple.interaction.clone())
                .map_err(|e| RecordError::malformed(format!("hoi {index}: {e}")))?;
        }

        Ok(set)
    }

    /// Serialize to the on-disk JSON form.
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the on-disk JSON form. Missing required fields and syntax
    /// errors both surface as [`RecordError::Malformed`].
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        serde_json::from_str(json).map_err(|e| RecordError::malformed(e.to_string()))
    }
}

/// `no_interaction` triples from box 0 to every other box, provided box 0 is
/// a person. Anything else gets no relations at all.
fn auto_relations(set: &AnnotationSet) -> Vec<HoiTriple> {
    match set.box_at(0) {
        Some(first) if first.label.is_person() => (1..set.len())
            .map(|object_id| HoiTriple {
                subject_id: 0,
                object_id,
                interaction: NO_INTERACTION.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}
