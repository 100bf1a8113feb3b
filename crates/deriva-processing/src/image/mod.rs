//! Image transcoding
//!
//! - [`resize`]: cover and inside fitting
//! - [`transcoder`]: decode, fit, encode to WebP

pub mod resize;
pub mod transcoder;

pub use resize::ImageResize;
pub use transcoder::{ImageTranscoder, TranscodeError};
