use std::collections::HashMap;

use crate::constants::{
    OPTIMIZED_METADATA_KEY, OPTIMIZED_METADATA_VALUE, OUTPUT_CONTENT_TYPE, OUTPUT_EXTENSION,
};

/// Resize strategy of a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Crop to exactly fill width x height.
    #[default]
    Cover,
    /// Scale to fit within the bounds, preserving aspect ratio.
    Inside,
}

/// RGBA colour used as a compositing background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(255, 255, 255, 0);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// One output variant the planner asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivativeSpec {
    /// Literal filename suffix (`thumb`, `small`, ...). `None` for single-derivative purposes.
    pub suffix: Option<&'static str>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit_mode: FitMode,
    /// Encoder quality, 0-100, passed through unmodified.
    pub quality: u8,
    pub background: Option<Rgba>,
    /// Never scale past the source resolution (only meaningful for [`FitMode::Inside`]).
    pub without_enlargement: bool,
}

impl DerivativeSpec {
    /// Exact-box crop.
    pub const fn cover(width: u32, height: u32, quality: u8) -> Self {
        Self {
            suffix: None,
            width: Some(width),
            height: Some(height),
            fit_mode: FitMode::Cover,
            quality,
            background: None,
            without_enlargement: false,
        }
    }

    /// Width-bounded fit that never enlarges.
    pub const fn inside_width(width: u32, quality: u8) -> Self {
        Self {
            suffix: None,
            width: Some(width),
            height: None,
            fit_mode: FitMode::Inside,
            quality,
            background: None,
            without_enlargement: true,
        }
    }

    pub const fn with_suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub const fn with_background(mut self, background: Rgba) -> Self {
        self.background = Some(background);
        self
    }

    /// Destination key for this derivative of `source_path`.
    ///
    /// The extension of the last path segment is stripped, then `_{suffix}`
    /// (when present) and `.webp` are appended.
    pub fn output_path(&self, source_path: &str) -> String {
        let base = strip_extension(source_path);
        match self.suffix {
            Some(suffix) => format!("{}_{}.{}", base, suffix, OUTPUT_EXTENSION),
            None => format!("{}.{}", base, OUTPUT_EXTENSION),
        }
    }
}

/// Remove the extension of the final path segment, if any.
///
/// Dots in directory names are left alone, and a leading dot (hidden file) is
/// not treated as an extension separator.
pub fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(0) | None => path,
        Some(dot) => &path[..file_start + dot],
    }
}

/// A derivative ready to be written back to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub metadata: HashMap<String, String>,
}

impl OutputArtifact {
    /// Wrap encoded bytes with the output content type and the optimization tag.
    pub fn tagged(path: String, bytes: Vec<u8>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert(
            OPTIMIZED_METADATA_KEY.to_string(),
            OPTIMIZED_METADATA_VALUE.to_string(),
        );
        Self {
            path,
            bytes,
            content_type: OUTPUT_CONTENT_TYPE,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_single() {
        let spec = DerivativeSpec::cover(200, 200, 90);
        assert_eq!(
            spec.output_path("businesses/abc123/logo.png"),
            "businesses/abc123/logo.webp"
        );
    }

    #[test]
    fn test_output_path_with_suffix() {
        let spec = DerivativeSpec::inside_width(480, 80).with_suffix("small");
        assert_eq!(
            spec.output_path("events/e1/banner_raw.jpg"),
            "events/e1/banner_raw_small.webp"
        );
    }

    #[test]
    fn test_strip_extension_edge_cases() {
        assert_eq!(strip_extension("a/b.c/file"), "a/b.c/file");
        assert_eq!(strip_extension("a/b/.hidden"), "a/b/.hidden");
        assert_eq!(strip_extension("a/b/photo.final.jpeg"), "a/b/photo.final");
        assert_eq!(strip_extension("logo.png"), "logo");
        assert_eq!(strip_extension(""), "");
    }

    #[test]
    fn test_tagged_artifact() {
        let artifact = OutputArtifact::tagged("x.webp".to_string(), vec![1, 2, 3]);
        assert_eq!(artifact.content_type, "image/webp");
        assert_eq!(artifact.metadata.get("optimized").map(String::as_str), Some("true"));
    }
}
