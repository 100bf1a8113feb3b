use std::path::Path;

use deriva_core::{PipelineError, PipelineResult};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Temporary file owned by exactly one job.
///
/// The file is unlinked on [`ScratchFile::cleanup`], or on drop when the job
/// future is cancelled before reaching cleanup.
#[derive(Debug)]
pub struct ScratchFile {
    inner: NamedTempFile,
}

impl ScratchFile {
    /// Create an empty scratch file in `dir` with a random, job-unique name.
    pub fn create_in(dir: &Path) -> PipelineResult<Self> {
        let prefix = format!("deriva-{}-", Uuid::new_v4());
        let inner = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(dir)
            .map_err(|e| {
                PipelineError::Scratch(format!(
                    "Failed to create scratch file in {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        Ok(Self { inner })
    }

    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Delete the file. Failures are logged and swallowed.
    pub fn cleanup(self) {
        let path = self.inner.path().to_path_buf();
        match self.inner.close() {
            Ok(()) => tracing::debug!(path = %path.display(), "Scratch file removed"),
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove scratch file"
            ),
        }
    }
}
