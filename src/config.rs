//! Vocabulary and tunables configuration.
//!
//! The object and interaction vocabularies are fixed per labeling campaign
//! and loaded from a JSON file; the defaults match the vocabularies the tool
//! ships with. Vocabularies constrain what the UI offers, not what a record
//! may contain.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current configuration file format version.
pub const CONFIG_VERSION: u32 = 1;

/// Errors loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tool configuration: vocabularies and interaction tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Object labels offered alongside "person", kept sorted for display
    #[serde(default = "default_object_vocabulary")]
    pub object_vocabulary: Vec<String>,

    /// Interaction types offered when connecting two boxes
    #[serde(default = "default_interaction_vocabulary")]
    pub interaction_vocabulary: Vec<String>,

    /// Chebyshev distance within which a pointer grabs a box corner
    #[serde(default = "default_resize_threshold")]
    pub resize_threshold: i32,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_object_vocabulary() -> Vec<String> {
    ["apple", "book", "bottle", "cell phone", "couch", "cup", "laptop"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_interaction_vocabulary() -> Vec<String> {
    [
        "drink_with",
        "eat",
        "hold",
        "lie_on",
        "no_interaction",
        "read",
        "sit_on",
        "talk_on",
        "text_on",
        "type_on",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_resize_threshold() -> i32 {
    crate::editor::DEFAULT_RESIZE_THRESHOLD
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            object_vocabulary: default_object_vocabulary(),
            interaction_vocabulary: default_interaction_vocabulary(),
            resize_threshold: default_resize_threshold(),
        }
    }
}

impl ToolConfig {
    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from a JSON string. Missing fields fall back to defaults; an
    /// unexpected version is warned about, not rejected.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version != CONFIG_VERSION {
            log::warn!(
                "config version mismatch: expected {}, got {}",
                CONFIG_VERSION,
                config.version
            );
        }
        Ok(config)
    }

    /// Save the configuration to a file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load the configuration from a file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Whether a tag is in the object vocabulary.
    pub fn is_known_object(&self, tag: &str) -> bool {
        self.object_vocabulary.iter().any(|o| o == tag)
    }

    /// Whether an interaction type is in the vocabulary.
    pub fn is_known_interaction(&self, interaction: &str) -> bool {
        self.interaction_vocabulary.iter().any(|i| i == interaction)
    }
}
