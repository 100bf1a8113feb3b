//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked object body.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Attributes written alongside an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    /// Custom metadata; the pipeline's optimization tag travels here.
    pub metadata: HashMap<String, String>,
}

impl UploadOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

/// What a backend knows about a stored object without reading its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    pub size: u64,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// The derivative pipeline receives an `Arc<dyn Storage>` and never reaches for
/// a process-wide client.
///
/// **Key format:** keys are the virtual object paths from storage notifications,
/// used verbatim. See the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Download a file as a stream
    ///
    /// The stream yields `Bytes` chunks as they become available.
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream>;

    /// Upload data to a specific storage key with its content type and custom metadata.
    ///
    /// A put is a single atomic overwrite of the key. Returns the public URL of the object.
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<String>;

    /// Read size, content type and custom metadata of an object.
    async fn head(&self, storage_key: &str) -> StorageResult<ObjectInfo>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
