//! Record persistence.
//!
//! The core reads and writes [`ImageRecord`]s through the [`RecordStore`]
//! trait. [`DirectoryStore`] is the production implementation: one JSON file
//! per image in a flat directory, keyed by the image base name with a fixed
//! extension. [`MemoryStore`] backs tests and hosts without a filesystem.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::record::{ImageRecord, RecordError};

/// File extension for per-image record files.
pub const RECORD_EXTENSION: &str = "txt";

/// Load/save access to per-image records, keyed by image file name.
pub trait RecordStore {
    /// Load the record for an image. A missing record means "no annotations
    /// yet" and returns `Ok(None)`, never an error.
    fn load(&self, image_name: &str) -> Result<Option<ImageRecord>, RecordError>;

    /// Save the record for an image, replacing any previous one.
    fn save(&mut self, image_name: &str, record: &ImageRecord) -> Result<(), RecordError>;
}

/// Stores one record file per image in a flat directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Use an existing directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use a directory, creating it (and parents) if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, RecordError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The record path for an image: base name (extension stripped) plus the
    /// record extension, inside the store directory.
    pub fn record_path(&self, image_name: &str) -> PathBuf {
        let stem = Path::new(image_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_name.to_string());
        self.dir.join(format!("{stem}.{RECORD_EXTENSION}"))
    }

    /// Concatenate the records of the given images into a single
    /// line-per-record file (the `.odgt` dataset export). Images without a
    /// record are skipped. Returns the number of records written.
    pub fn concatenate_records<'a>(
        &self,
        image_names: impl IntoIterator<Item = &'a str>,
        out: &Path,
    ) -> Result<usize, RecordError> {
        let mut lines = String::new();
        let mut written = 0;
        for name in image_names {
            if let Some(record) = self.load(name)? {
                lines.push_str(&record.to_json()?);
                lines.push('\n');
                written += 1;
            }
        }
        fs::write(out, lines)?;
        log::info!("Wrote {} records to {:?}", written, out);
        Ok(written)
    }
}

impl RecordStore for DirectoryStore {
    fn load(&self, image_name: &str) -> Result<Option<ImageRecord>, RecordError> {
        let path = self.record_path(image_name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = ImageRecord::from_json(&json)?;
        log::debug!(
            "Loaded record for {} ({} boxes, {} relations)",
            image_name,
            record.gtboxes.len(),
            record.hoi.len()
        );
        Ok(Some(record))
    }

    fn save(&mut self, image_name: &str, record: &ImageRecord) -> Result<(), RecordError> {
        let path = self.record_path(image_name);
        fs::write(&path, record.to_json()?)?;
        log::debug!(
            "Saved record for {} ({} boxes, {} relations)",
            image_name,
            record.gtboxes.len(),
            record.hoi.len()
        );
        Ok(())
    }
}

/// In-memory record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: HashMap<String, ImageRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, image_name: &str) -> Result<Option<ImageRecord>, RecordError> {
        Ok(self.records.get(image_name).cloned())
    }

    fn save(&mut self, image_name: &str, record: &ImageRecord) -> Result<(), RecordError> {
        self.records.insert(image_name.to_string(), record.clone());
        Ok(())
    }
}
