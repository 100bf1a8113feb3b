//! Image transcoder
//!
//! Decodes a source image once and produces WebP bytes for each requested
//! derivative. Pure CPU work: callers on an async runtime should run it on a
//! blocking thread.

use std::io::Cursor;

use deriva_core::{DerivativeSpec, PipelineError};
use image::{DynamicImage, GenericImageView, ImageReader};

use crate::compression::WebpEncoder;
use crate::image::resize::ImageResize;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),
}

impl From<TranscodeError> for PipelineError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::Decode(msg) => PipelineError::Decode(msg),
            TranscodeError::Encode(msg) => PipelineError::Encode(msg),
        }
    }
}

pub struct ImageTranscoder;

impl ImageTranscoder {
    /// Decode any format the `image` crate recognises from its magic bytes.
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage, TranscodeError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TranscodeError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| TranscodeError::Decode(e.to_string()))
    }

    /// Width and height of an encoded image.
    pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), TranscodeError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TranscodeError::Decode(e.to_string()))?
            .into_dimensions()
            .map_err(|e| TranscodeError::Decode(e.to_string()))
    }

    /// Render one derivative from an already decoded image.
    pub fn render(img: &DynamicImage, spec: &DerivativeSpec) -> Result<Vec<u8>, TranscodeError> {
        let resized = ImageResize::apply(img, spec);
        let (width, height) = resized.dimensions();
        let bytes = WebpEncoder::encode(&resized, spec.quality)?;

        tracing::debug!(
            suffix = spec.suffix.unwrap_or("-"),
            width = width,
            height = height,
            quality = spec.quality,
            size_bytes = bytes.len(),
            "Derivative encoded"
        );

        Ok(bytes)
    }

    /// Decode `bytes` and render a single derivative.
    pub fn transcode(bytes: &[u8], spec: &DerivativeSpec) -> Result<Vec<u8>, TranscodeError> {
        let img = Self::decode(bytes)?;
        Self::render(&img, spec)
    }

    /// Decode once and render every spec, in order. Stops at the first failure.
    pub fn transcode_many(
        bytes: &[u8],
        specs: &[DerivativeSpec],
    ) -> Result<Vec<Vec<u8>>, TranscodeError> {
        let img = Self::decode(bytes)?;
        specs.iter().map(|spec| Self::render(&img, spec)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
    }

    #[test]
    fn test_cover_output_has_exact_dimensions() {
        let source = jpeg(640, 360);
        let out = ImageTranscoder::transcode(&source, &DerivativeSpec::cover(200, 200, 90)).unwrap();
        assert_eq!(ImageTranscoder::read_dimensions(&out).unwrap(), (200, 200));
    }

    #[test]
    fn test_inside_never_enlarges_and_keeps_aspect() {
        let source = jpeg(300, 200);
        let out =
            ImageTranscoder::transcode(&source, &DerivativeSpec::inside_width(1440, 80)).unwrap();
        assert_eq!(ImageTranscoder::read_dimensions(&out).unwrap(), (300, 200));

        let source = jpeg(1000, 333);
        let out =
            ImageTranscoder::transcode(&source, &DerivativeSpec::inside_width(480, 80)).unwrap();
        let (w, h) = ImageTranscoder::read_dimensions(&out).unwrap();
        assert_eq!(w, 480);
        let expected = 480.0 * 333.0 / 1000.0;
        assert!((h as f64 - expected).abs() <= 1.0);
    }

    #[test]
    fn test_output_is_webp() {
        let source = jpeg(64, 64);
        let out = ImageTranscoder::transcode(&source, &DerivativeSpec::cover(32, 32, 75)).unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn test_png_with_alpha_on_transparent_logo() {
        let img = RgbaImage::from_pixel(300, 300, Rgba([10, 20, 30, 0]));
        let source = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);
        let spec = DerivativeSpec::cover(200, 200, 90).with_background(deriva_core::Rgba::TRANSPARENT);
        let out = ImageTranscoder::transcode(&source, &spec).unwrap();
        assert_eq!(ImageTranscoder::read_dimensions(&out).unwrap(), (200, 200));
    }

    #[test]
    fn test_corrupted_bytes_are_decode_errors() {
        let result = ImageTranscoder::transcode(b"not an image at all", &DerivativeSpec::cover(1, 1, 50));
        assert!(matches!(result, Err(TranscodeError::Decode(_))));

        let mut truncated = jpeg(64, 64);
        truncated.truncate(40);
        let result = ImageTranscoder::transcode_many(&truncated, &[DerivativeSpec::cover(8, 8, 50)]);
        assert!(matches!(result, Err(TranscodeError::Decode(_))));
    }

    #[test]
    fn test_transcode_many_preserves_order() {
        let source = jpeg(2000, 1000);
        let specs = [
            DerivativeSpec::inside_width(1920, 85).with_suffix("slide"),
            DerivativeSpec::inside_width(400, 60).with_suffix("thumb"),
        ];
        let outputs = ImageTranscoder::transcode_many(&source, &specs).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(ImageTranscoder::read_dimensions(&outputs[0]).unwrap(), (1920, 960));
        assert_eq!(ImageTranscoder::read_dimensions(&outputs[1]).unwrap(), (400, 200));
    }

    #[test]
    fn test_decode_error_maps_to_pipeline_error() {
        let err: PipelineError = TranscodeError::Decode("bad".to_string()).into();
        assert!(matches!(err, PipelineError::Decode(_)));
    }
}
