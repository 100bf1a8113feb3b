//! Deriva Processing Library
//!
//! Pure, I/O-free building blocks of the derivative pipeline:
//!
//! - [`classifier`]: object path to [`Purpose`](deriva_core::Purpose)
//! - [`planner`]: (purpose, category) to the ordered list of derivatives
//! - [`image`]: decode, resize and WebP-encode one derivative

pub mod classifier;
pub mod compression;
pub mod image;
pub mod planner;

pub use classifier::classify;
pub use compression::WebpEncoder;
pub use image::{ImageResize, ImageTranscoder, TranscodeError};
pub use planner::{is_derivative_path, plan, DerivativePlanner, PlanTable};
