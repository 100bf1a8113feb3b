//! Pipeline orchestrator
//!
//! One [`DerivativePipeline`] per category. Each call to
//! [`DerivativePipeline::handle`] is an independent job that walks
//!
//! ```text
//! Idle -> Validating -> Downloading -> Transcoding -> Uploading -> CleaningUp -> Done
//!             |              |              |             |
//!          Skipped           +--------------+-------------+--> CleaningUp -> Failed
//! ```
//!
//! Scratch space is released on every path that allocated it.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;

use deriva_core::constants::OUTPUT_CONTENT_TYPE;
use deriva_core::{
    Category, DerivativeSpec, ErrorMetadata, LogLevel, OutputArtifact, PipelineError,
    PipelineResult, Purpose, SkipReason, UploadEvent,
};
use deriva_processing::{classify, is_derivative_path, DerivativePlanner, ImageTranscoder};
use deriva_storage::{Storage, UploadOptions};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::Instrument;

use crate::scratch::ScratchFile;

/// Per-category wiring of the pipeline.
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    category: Category,
    root_prefix: String,
    planner: DerivativePlanner,
}

impl CategoryConfig {
    /// Built-in prefix and sizing table of `category`.
    pub fn for_category(category: Category) -> Self {
        Self {
            category,
            root_prefix: category.root_prefix().to_string(),
            planner: DerivativePlanner::for_category(category),
        }
    }

    pub fn with_root_prefix(mut self, root_prefix: impl Into<String>) -> Self {
        self.root_prefix = root_prefix.into();
        self
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn root_prefix(&self) -> &str {
        &self.root_prefix
    }
}

/// Phase of a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Validating,
    Downloading,
    Transcoding,
    Uploading,
    CleaningUp,
    Done,
    Skipped,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Validating => "validating",
            JobState::Downloading => "downloading",
            JobState::Transcoding => "transcoding",
            JobState::Uploading => "uploading",
            JobState::CleaningUp => "cleaning_up",
            JobState::Done => "done",
            JobState::Skipped => "skipped",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Skipped | JobState::Failed)
    }
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A derivative that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReceipt {
    pub path: String,
    pub url: String,
    pub size_bytes: usize,
}

/// How a job ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Completed(Vec<ArtifactReceipt>),
}

impl Outcome {
    pub fn artifacts(&self) -> &[ArtifactReceipt] {
        match self {
            Outcome::Skipped(_) => &[],
            Outcome::Completed(receipts) => receipts,
        }
    }
}

struct Job {
    state: JobState,
}

impl Job {
    fn advance(&mut self, next: JobState) {
        debug_assert!(
            !self.state.is_terminal(),
            "job already ended as {}",
            self.state
        );
        tracing::debug!(from = %self.state, to = %next, "Job state transition");
        self.state = next;
    }
}

/// Work decided by Validating.
struct Plan {
    purpose: Purpose,
    specs: &'static [DerivativeSpec],
}

pub struct DerivativePipeline {
    config: CategoryConfig,
    storage: Arc<dyn Storage>,
    scratch_dir: PathBuf,
}

impl DerivativePipeline {
    pub fn new(config: CategoryConfig, storage: Arc<dyn Storage>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            storage,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn category(&self) -> Category {
        self.config.category
    }

    /// Run one job for `event`.
    ///
    /// Skips are `Ok(Outcome::Skipped)`; failures are returned after scratch
    /// space has been released.
    pub async fn handle(&self, event: &UploadEvent) -> PipelineResult<Outcome> {
        let span = tracing::info_span!(
            "derivative_job",
            category = %self.config.category,
            path = %event.object_path
        );
        self.run(event).instrument(span).await
    }

    async fn run(&self, event: &UploadEvent) -> PipelineResult<Outcome> {
        let mut job = Job {
            state: JobState::Idle,
        };

        job.advance(JobState::Validating);
        let plan = match self.validate(event) {
            Ok(plan) => plan,
            Err(reason) => {
                job.advance(JobState::Skipped);
                tracing::info!(reason = %reason, "Upload skipped");
                return Ok(Outcome::Skipped(reason));
            }
        };

        job.advance(JobState::Downloading);
        let scratch = match ScratchFile::create_in(&self.scratch_dir) {
            Ok(scratch) => scratch,
            Err(e) => {
                job.advance(JobState::Failed);
                Self::log_failure(&e, plan.purpose);
                return Err(e);
            }
        };

        let result = self.execute(&mut job, event, &plan, &scratch).await;

        job.advance(JobState::CleaningUp);
        scratch.cleanup();

        match result {
            Ok(receipts) => {
                job.advance(JobState::Done);
                tracing::info!(
                    purpose = %plan.purpose,
                    artifacts = receipts.len(),
                    "Derivatives written"
                );
                Ok(Outcome::Completed(receipts))
            }
            Err(e) => {
                job.advance(JobState::Failed);
                Self::log_failure(&e, plan.purpose);
                Err(e)
            }
        }
    }

    /// Guards in priority order; the first that holds decides the skip.
    fn validate(&self, event: &UploadEvent) -> Result<Plan, SkipReason> {
        let path = event.object_path.as_str();

        if event.is_optimized() {
            return Err(SkipReason::SelfProducedArtifact);
        }
        if event.content_type == OUTPUT_CONTENT_TYPE && is_derivative_path(path) {
            return Err(SkipReason::DerivativeName);
        }
        if path.is_empty() || !path.starts_with(&self.config.root_prefix) {
            return Err(SkipReason::ForeignPath);
        }
        if !event.is_image() {
            return Err(SkipReason::NonImageUpload);
        }

        let purpose = classify(path);
        if purpose == Purpose::Unknown {
            return Err(SkipReason::UnrecognizedNamingConvention);
        }

        let specs = self.config.planner.plan(purpose);
        if specs.is_empty() {
            return Err(SkipReason::EmptyPlan);
        }

        Ok(Plan { purpose, specs })
    }

    async fn execute(
        &self,
        job: &mut Job,
        event: &UploadEvent,
        plan: &Plan,
        scratch: &ScratchFile,
    ) -> PipelineResult<Vec<ArtifactReceipt>> {
        let source_path = event.object_path.as_str();

        let source = self.download_to_scratch(source_path, scratch).await?;

        job.advance(JobState::Transcoding);
        let artifacts = Self::transcode(source_path, source, plan.specs).await?;

        job.advance(JobState::Uploading);
        self.upload_all(artifacts).await
    }

    async fn download_to_scratch(
        &self,
        source_path: &str,
        scratch: &ScratchFile,
    ) -> PipelineResult<Vec<u8>> {
        let fetch_error = |message: String| PipelineError::SourceFetch {
            path: source_path.to_string(),
            message,
        };

        let mut stream = self
            .storage
            .download_stream(source_path)
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(scratch.path())
            .await
            .map_err(|e| PipelineError::Scratch(e.to_string()))?;

        let mut size: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fetch_error(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PipelineError::Scratch(e.to_string()))?;
            size += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| PipelineError::Scratch(e.to_string()))?;
        drop(file);

        let source = tokio::fs::read(scratch.path())
            .await
            .map_err(|e| PipelineError::Scratch(e.to_string()))?;

        match ImageTranscoder::read_dimensions(&source) {
            Ok((width, height)) => tracing::debug!(
                size_bytes = size,
                width = width,
                height = height,
                "Source downloaded to scratch"
            ),
            Err(_) => tracing::debug!(size_bytes = size, "Source downloaded to scratch"),
        }

        Ok(source)
    }

    /// Render every planned derivative before anything is written.
    async fn transcode(
        source_path: &str,
        source: Vec<u8>,
        specs: &'static [DerivativeSpec],
    ) -> PipelineResult<Vec<OutputArtifact>> {
        let encoded = tokio::task::spawn_blocking(move || {
            ImageTranscoder::transcode_many(&source, specs)
        })
        .await
        .map_err(|e| PipelineError::Internal(format!("Transcode task failed: {}", e)))??;

        Ok(specs
            .iter()
            .zip(encoded)
            .map(|(spec, bytes)| OutputArtifact::tagged(spec.output_path(source_path), bytes))
            .collect())
    }

    /// Sequential uploads; earlier artifacts stay in place when a later one fails.
    async fn upload_all(&self, artifacts: Vec<OutputArtifact>) -> PipelineResult<Vec<ArtifactReceipt>> {
        let mut receipts = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            let size_bytes = artifact.bytes.len();
            let options =
                UploadOptions::new(artifact.content_type).with_metadata(artifact.metadata);

            let url = self
                .storage
                .upload_with_key(&artifact.path, artifact.bytes, &options)
                .await
                .map_err(|e| PipelineError::DestinationWrite {
                    path: artifact.path.clone(),
                    message: e.to_string(),
                    uploaded: receipts.len(),
                })?;

            receipts.push(ArtifactReceipt {
                path: artifact.path,
                url,
                size_bytes,
            });
        }

        Ok(receipts)
    }

    fn log_failure(err: &PipelineError, purpose: Purpose) {
        match err.log_level() {
            LogLevel::Debug => tracing::debug!(
                purpose = %purpose,
                error = %err,
                error_code = err.error_code(),
                recoverable = err.is_recoverable(),
                "Derivative job failed"
            ),
            LogLevel::Warn => tracing::warn!(
                purpose = %purpose,
                error = %err,
                error_code = err.error_code(),
                recoverable = err.is_recoverable(),
                "Derivative job failed"
            ),
            LogLevel::Error => tracing::error!(
                purpose = %purpose,
                error = %err,
                error_code = err.error_code(),
                recoverable = err.is_recoverable(),
                "Derivative job failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_terminals() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Skipped.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::CleaningUp.is_terminal());
        assert_eq!(JobState::CleaningUp.to_string(), "cleaning_up");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "job already ended as done")]
    fn test_terminal_job_cannot_advance() {
        let mut job = Job {
            state: JobState::Idle,
        };
        job.advance(JobState::Done);
        job.advance(JobState::Uploading);
    }

    #[test]
    fn test_category_config_builder() {
        let config = CategoryConfig::for_category(Category::Events);
        assert_eq!(config.root_prefix(), "events/");
        assert_eq!(config.category(), Category::Events);

        let config = config.with_root_prefix("staging/events/");
        assert_eq!(config.root_prefix(), "staging/events/");
    }

    #[test]
    fn test_outcome_artifacts() {
        assert!(Outcome::Skipped(SkipReason::ForeignPath).artifacts().is_empty());
        let receipt = ArtifactReceipt {
            path: "a.webp".to_string(),
            url: "http://x/a.webp".to_string(),
            size_bytes: 3,
        };
        assert_eq!(Outcome::Completed(vec![receipt]).artifacts().len(), 1);
    }
}
