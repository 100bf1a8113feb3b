//! Deriva Worker
//!
//! Drives derivative jobs end to end:
//!
//! - [`pipeline`]: per-category state machine (validate, download, transcode, upload, clean up)
//! - [`dispatcher`]: fans notifications out to every category with bounded concurrency and a timeout
//! - [`scratch`]: per-job temporary file that is removed even when the job is cancelled
//! - [`telemetry`]: tracing subscriber setup for the binary

pub mod dispatcher;
pub mod pipeline;
pub mod scratch;
pub mod telemetry;

pub use dispatcher::{wait_for_slot, EventDispatcher, JobReport};
pub use pipeline::{ArtifactReceipt, CategoryConfig, DerivativePipeline, JobState, Outcome};
pub use scratch::ScratchFile;
