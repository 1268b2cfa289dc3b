//! Data models for the media library

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::ArtifactKind;

/// An item stored in the media library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier (UUID)
    pub id: String,

    /// Video or still image
    pub kind: ArtifactKind,

    /// Path of the capture this asset was saved from
    pub original_name: String,

    /// File name inside the library directory
    pub file_name: String,

    /// Size of the stored file in bytes
    pub byte_size: u64,

    /// When the asset was added
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Create a new asset record
    pub fn new(kind: ArtifactKind, original_name: String, file_name: String, byte_size: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            original_name,
            file_name,
            byte_size,
            created_at: Utc::now(),
        }
    }

    /// Short identifier used in listings
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}
