//! Transient domain models
//!
//! Every value here lives for a single job invocation; nothing is persisted.

pub mod category;
pub mod derivative;
pub mod event;

pub use category::{Category, Purpose};
pub use derivative::{DerivativeSpec, FitMode, OutputArtifact, Rgba};
pub use event::UploadEvent;
