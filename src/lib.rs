//! HOAT - Human-Object Annotation Tool core.
//!
//! The data model, interaction state machine, and navigation policies for
//! labeling images with bounding boxes and human-object interaction triples.
//! The crate owns geometric and relational state and persists one JSON record
//! per image; rendering and file dialogs stay in the host application,
//! reached through the [`render::RenderSurface`] and [`store::RecordStore`]
//! traits.

pub mod annotation;
pub mod config;
pub mod editor;
pub mod geometry;
pub mod navigation;
pub mod record;
pub mod render;
pub mod store;

pub use annotation::{
    AnnotationError, AnnotationSet, BoundingBox, BoxId, Label, Relation, RelationId,
};
pub use config::ToolConfig;
pub use editor::{Editor, Mode};
pub use geometry::{Corner, Point, Rect};
pub use navigation::{ImageInfo, NavigationError, Navigator};
pub use record::{ImageRecord, RecordError, NO_INTERACTION};
pub use render::{draw_all, Color, RenderSurface, ShapeTag};
pub use store::{DirectoryStore, MemoryStore, RecordStore};
