//! Deriva Storage Library
//!
//! This crate provides the object-store abstraction the derivative pipeline
//! reads sources from and writes derivatives to, with S3 and local filesystem
//! implementations.
//!
//! # Storage key format
//!
//! Keys are the slash-delimited virtual paths carried by storage-finalize
//! notifications (`businesses/abc123/logo.png`). They are used verbatim by
//! every backend, so the pipeline's naming convention is preserved bit-exact.
//! Keys must be non-empty and must not contain `..` or a leading `/`; the
//! check is centralized in the `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use deriva_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteStream, ObjectInfo, Storage, StorageError, StorageResult, UploadOptions};
