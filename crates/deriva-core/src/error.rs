//! Error types module
//!
//! Failures of a derivative job are unified under [`PipelineError`]. Skips are
//! not errors: they are described by [`SkipReason`] and end the invocation
//! cleanly. Cleanup problems never appear here; they are logged and swallowed
//! by the orchestrator.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions
    Debug,
    /// Warning level - for bad input that retrying cannot fix
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported to the invoking platform.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "SOURCE_FETCH_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether a redelivery of the same event could succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Why Validating ended the invocation without doing any work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Metadata carries the optimization tag.
    SelfProducedArtifact,
    /// WebP upload named like a derivative; covers a lost tag.
    DerivativeName,
    /// Empty path or outside this category's root prefix.
    ForeignPath,
    /// Content type is not `image/*`.
    NonImageUpload,
    /// Path matches no purpose rule.
    UnrecognizedNamingConvention,
    /// Purpose is known but this category plans nothing for it.
    EmptyPlan,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::SelfProducedArtifact => "self-produced artifact",
            SkipReason::DerivativeName => "derivative name without tag",
            SkipReason::ForeignPath => "foreign path",
            SkipReason::NonImageUpload => "non-image upload",
            SkipReason::UnrecognizedNamingConvention => "unrecognized naming convention",
            SkipReason::EmptyPlan => "no derivatives planned",
        }
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to fetch source {path}: {message}")]
    SourceFetch { path: String, message: String },

    #[error("Failed to decode source image: {0}")]
    Decode(String),

    #[error("Failed to encode derivative: {0}")]
    Encode(String),

    #[error("Failed to write derivative {path}: {message} ({uploaded} earlier derivative(s) kept)")]
    DestinationWrite {
        path: String,
        message: String,
        uploaded: usize,
    },

    #[error("Job exceeded the {seconds}s timeout ceiling")]
    Timeout { seconds: u64 },

    #[error("Scratch space error: {0}")]
    Scratch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn pipeline_error_static_metadata(err: &PipelineError) -> (&'static str, bool, LogLevel) {
    match err {
        PipelineError::SourceFetch { .. } => ("SOURCE_FETCH_ERROR", true, LogLevel::Error),
        PipelineError::Decode(_) => ("DECODE_ERROR", false, LogLevel::Warn),
        PipelineError::Encode(_) => ("ENCODE_ERROR", false, LogLevel::Error),
        PipelineError::DestinationWrite { .. } => {
            ("DESTINATION_WRITE_ERROR", true, LogLevel::Error)
        }
        PipelineError::Timeout { .. } => ("TIMEOUT", true, LogLevel::Error),
        PipelineError::Scratch(_) => ("SCRATCH_ERROR", true, LogLevel::Error),
        PipelineError::Internal(_) => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for PipelineError {
    fn error_code(&self) -> &'static str {
        pipeline_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        pipeline_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        pipeline_error_static_metadata(self).2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_is_not_recoverable() {
        let err = PipelineError::Decode("bad header".to_string());
        assert_eq!(err.error_code(), "DECODE_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_destination_write_message_counts_kept_uploads() {
        let err = PipelineError::DestinationWrite {
            path: "events/e1/b_large.webp".to_string(),
            message: "connection reset".to_string(),
            uploaded: 2,
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("2 earlier derivative(s) kept"));
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::ForeignPath.to_string(), "foreign path");
        assert_eq!(
            SkipReason::SelfProducedArtifact.to_string(),
            "self-produced artifact"
        );
    }
}
