//! Deriva Core Library
//!
//! This crate provides the domain model, error taxonomy, constants and
//! configuration shared by every Deriva component. It performs no I/O beyond
//! reading the process environment.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{ErrorMetadata, LogLevel, PipelineError, PipelineResult, SkipReason};
pub use models::{
    Category, DerivativeSpec, FitMode, OutputArtifact, Purpose, Rgba, UploadEvent,
};
pub use storage_types::StorageBackend;
