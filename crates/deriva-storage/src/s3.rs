use crate::keys::validate_key;
use crate::traits::{ByteStream, ObjectInfo, Storage, StorageError, StorageResult, UploadOptions};
use crate::StorageBackend;
use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectStore, ObjectStoreExt, PutOptions,
    PutPayload, Result as ObjectResult,
};
use std::borrow::Cow;
use std::collections::HashMap;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        // Credentials come from the environment; bucket and region are explicit.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style URLs on the endpoint
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    fn location(storage_key: &str) -> StorageResult<Path> {
        validate_key(storage_key)?;
        Ok(Path::from(storage_key))
    }

    fn map_get_error(storage_key: &str, e: ObjectStoreError) -> StorageError {
        match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => StorageError::DownloadFailed(other.to_string()),
        }
    }
}

/// Translate upload options into object attributes (content type + `x-amz-meta-*`).
fn to_attributes(options: &UploadOptions) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(
        Attribute::ContentType,
        AttributeValue::from(options.content_type.clone()),
    );
    for (key, value) in &options.metadata {
        attributes.insert(
            Attribute::Metadata(Cow::Owned(key.clone())),
            AttributeValue::from(value.clone()),
        );
    }
    attributes
}

fn from_attributes(attributes: &Attributes) -> (Option<String>, HashMap<String, String>) {
    let mut content_type = None;
    let mut metadata = HashMap::new();
    for (attribute, value) in attributes.iter() {
        match attribute {
            Attribute::ContentType => content_type = Some(value.to_string()),
            Attribute::Metadata(key) => {
                metadata.insert(key.to_string(), value.to_string());
            }
            _ => {}
        }
    }
    (content_type, metadata)
}

#[async_trait]
impl Storage for S3Storage {
    async fn download_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let start = std::time::Instant::now();
        let location = Self::location(storage_key)?;

        let result: ObjectResult<_> = self.store.get(&location).await;
        let result = result.map_err(|e| Self::map_get_error(storage_key, e))?;

        let bucket = self.bucket.clone();
        let key = storage_key.to_string();

        let stream = result.into_stream().map(move |res| match res {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                Err(StorageError::DownloadFailed(e.to_string()))
            }
        });

        Ok(Box::pin(stream))
    }

    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StorageResult<String> {
        let size = data.len() as u64;
        let location = Self::location(storage_key)?;
        let start = std::time::Instant::now();

        let put_options = PutOptions {
            attributes: to_attributes(options),
            ..Default::default()
        };

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(data), put_options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload_with_key failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.generate_url(storage_key);

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            content_type = %options.content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload_with_key successful"
        );

        Ok(url)
    }

    async fn head(&self, storage_key: &str) -> StorageResult<ObjectInfo> {
        let location = Self::location(storage_key)?;

        // A HEAD through get_opts also returns the object attributes.
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result: ObjectResult<_> = self.store.get_opts(&location, options).await;
        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(storage_key.to_string()),
            other => StorageError::BackendError(other.to_string()),
        })?;

        let (content_type, metadata) = from_attributes(&result.attributes);

        Ok(ObjectInfo {
            size: result.meta.size,
            content_type,
            metadata,
        })
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_carry_tag() {
        let mut metadata = HashMap::new();
        metadata.insert("optimized".to_string(), "true".to_string());
        let options = UploadOptions::new("image/webp").with_metadata(metadata);

        let attributes = to_attributes(&options);
        let (content_type, metadata) = from_attributes(&attributes);

        assert_eq!(content_type.as_deref(), Some("image/webp"));
        assert_eq!(metadata.get("optimized").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_generate_url_with_custom_endpoint() {
        let storage = S3Storage::new(
            "directory-media".to_string(),
            "us-east-1".to_string(),
            Some("http://localhost:9000/".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(
            storage.generate_url("events/e1/banner_small.webp"),
            "http://localhost:9000/directory-media/events/e1/banner_small.webp"
        );
        assert_eq!(storage.backend_type(), StorageBackend::S3);
    }
}
