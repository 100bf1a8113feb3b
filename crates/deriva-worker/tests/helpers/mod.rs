//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use deriva_storage::{
    ByteStream, ObjectInfo, Storage, StorageBackend, StorageError, StorageResult, UploadOptions,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// In-memory storage with failure injection.
pub struct MockStorage {
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
    downloads: AtomicUsize,
    uploads: AtomicUsize,
    fail_uploads_after: Option<usize>,
    fail_downloads: bool,
    download_delay: Option<Duration>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            downloads: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            fail_uploads_after: None,
            fail_downloads: false,
            download_delay: None,
        }
    }

    /// Uploads succeed `count` times, then every further upload fails.
    pub fn failing_uploads_after(mut self, count: usize) -> Self {
        self.fail_uploads_after = Some(count);
        self
    }

    pub fn failing_downloads(mut self) -> Self {
        self.fail_downloads = true;
        self
    }

    /// Hold every download open for `delay` before returning the body.
    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = Some(delay);
        self
    }

    /// Set a file in the mock storage
    pub fn set_file(&self, key: &str, data: Vec<u8>, content_type: &str) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                metadata: HashMap::new(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    async fn fetch(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_downloads {
            return Err(StorageError::DownloadFailed("injected failure".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let data = self.fetch(storage_key).await?;
        // Two chunks so the pipeline has to reassemble the body.
        let mid = data.len() / 2;
        let chunks = vec![
            Ok(Bytes::copy_from_slice(&data[..mid])),
            Ok(Bytes::copy_from_slice(&data[mid..])),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<String> {
        let attempt = self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail_uploads_after.is_some_and(|limit| attempt >= limit) {
            return Err(StorageError::UploadFailed("injected failure".to_string()));
        }
        self.objects.lock().unwrap().insert(
            storage_key.to_string(),
            StoredObject {
                data,
                content_type: options.content_type.clone(),
                metadata: options.metadata.clone(),
            },
        );
        Ok(format!("https://example.com/{}", storage_key))
    }

    async fn head(&self, storage_key: &str) -> StorageResult<ObjectInfo> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|o| ObjectInfo {
                size: o.data.len() as u64,
                content_type: Some(o.content_type.clone()),
                metadata: o.metadata.clone(),
            })
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
    buffer
}

/// Gradient JPEG of the given size
pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// Half-transparent PNG of the given size
pub fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        Rgba([200, 30, 30, if x < width / 2 { 0 } else { 255 }])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    image::load_from_memory(bytes).unwrap().into_rgb8().dimensions()
}

pub fn is_webp(bytes: &[u8]) -> bool {
    image::guess_format(bytes).ok() == Some(ImageFormat::WebP)
}

/// Number of entries left in a scratch directory
pub fn scratch_entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
