use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{
    IMAGE_CONTENT_TYPE_PREFIX, OPTIMIZED_METADATA_KEY, OPTIMIZED_METADATA_VALUE,
};

/// Storage-finalize notification for a single object.
///
/// Field names accept both the snake_case form and the camelCase form used by
/// object-store notification bodies (`name`/`path`, `contentType`, `metadata`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadEvent {
    #[serde(alias = "path", alias = "name", alias = "objectPath")]
    pub object_path: String,
    #[serde(default, alias = "contentType")]
    pub content_type: String,
    #[serde(default, alias = "metadata", alias = "customMetadata")]
    pub custom_metadata: HashMap<String, String>,
}

impl UploadEvent {
    pub fn new(object_path: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            object_path: object_path.into(),
            content_type: content_type.into(),
            custom_metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_metadata.insert(key.into(), value.into());
        self
    }

    /// True when the object was written by the pipeline itself.
    pub fn is_optimized(&self) -> bool {
        self.custom_metadata
            .get(OPTIMIZED_METADATA_KEY)
            .is_some_and(|v| v == OPTIMIZED_METADATA_VALUE)
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with(IMAGE_CONTENT_TYPE_PREFIX)
    }
}
