use crate::keys::validate_key;
use crate::traits::{ByteStream, ObjectInfo, Storage, StorageError, StorageResult, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory under the storage root that holds per-object attribute sidecars.
const METADATA_DIR: &str = ".deriva-meta";

/// Attributes persisted next to each object, mirroring what S3 keeps in headers.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    content_type: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/deriva/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// This function validates that the storage key doesn't contain path traversal
    /// sequences that could escape the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        if storage_key.starts_with(METADATA_DIR) {
            return Err(StorageError::InvalidKey(
                "Storage key targets the metadata directory".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    fn sidecar_path(&self, storage_key: &str) -> PathBuf {
        self.base_path
            .join(METADATA_DIR)
            .join(format!("{}.json", storage_key))
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn write_sidecar(&self, storage_key: &str, options: &UploadOptions) -> StorageResult<()> {
        let path = self.sidecar_path(storage_key);
        self.ensure_parent_dir(&path).await?;

        let sidecar = Sidecar {
            content_type: options.content_type.clone(),
            metadata: options.metadata.clone(),
        };
        let json = serde_json::to_vec(&sidecar)
            .map_err(|e| StorageError::BackendError(format!("Failed to encode metadata: {}", e)))?;

        fs::write(&path, json).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write metadata {}: {}",
                path.display(),
                e
            ))
        })
    }

    async fn read_sidecar(&self, storage_key: &str) -> StorageResult<Sidecar> {
        let path = self.sidecar_path(storage_key);
        match fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                StorageError::BackendError(format!(
                    "Corrupt metadata {}: {}",
                    path.display(),
                    e
                ))
            }),
            // Objects copied into the directory by hand have no sidecar.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Sidecar::default()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to open file {}: {}", path.display(), e))
        })?;

        let key = storage_key.to_string();
        let path_display = path.display().to_string();
        let stream = tokio_util::io::ReaderStream::new(file).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    path = %path_display,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage stream download error"
                );
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        Ok(Box::pin(stream))
    }

    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        // Sidecar first: a reader that sees the object must also see its tag.
        self.write_sidecar(storage_key, options).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(storage_key);

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            content_type = %options.content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload_with_key successful"
        );

        Ok(url)
    }

    async fn head(&self, storage_key: &str) -> StorageResult<ObjectInfo> {
        let path = self.key_to_path(storage_key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        };

        let sidecar = self.read_sidecar(storage_key).await?;

        Ok(ObjectInfo {
            size: meta.len(),
            content_type: Some(sidecar.content_type).filter(|ct| !ct.is_empty()),
            metadata: sidecar.metadata,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
