//! Constants shared between the pipeline stages and every storage backend.

/// Custom metadata key written on every derivative.
pub const OPTIMIZED_METADATA_KEY: &str = "optimized";

/// Value paired with [`OPTIMIZED_METADATA_KEY`].
pub const OPTIMIZED_METADATA_VALUE: &str = "true";

/// MIME type of every derivative.
pub const OUTPUT_CONTENT_TYPE: &str = "image/webp";

/// File extension of every derivative, without the dot.
pub const OUTPUT_EXTENSION: &str = "webp";

/// Suffixes the planner uses for multi-derivative purposes.
///
/// Validating uses the same list to recognise derivatives whose tag was lost.
pub const DERIVATIVE_SUFFIXES: &[&str] = &["thumb", "slide", "small", "medium", "large", "xlarge"];

/// Content-type prefix an upload must carry to be considered an image.
pub const IMAGE_CONTENT_TYPE_PREFIX: &str = "image/";

pub const BUSINESSES_PREFIX: &str = "businesses/";
pub const EVENTS_PREFIX: &str = "events/";
pub const WORKSHOPS_PREFIX: &str = "workshops/";
