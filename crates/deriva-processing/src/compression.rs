use image::{DynamicImage, GenericImageView};

use crate::image::TranscodeError;

/// Largest width or height libwebp accepts.
pub const WEBP_MAX_DIMENSION: u32 = 16383;

/// Lossy WebP encoder
pub struct WebpEncoder;

impl WebpEncoder {
    /// Encode `img` as lossy WebP. `quality` (0-100) is passed to libwebp unmodified.
    pub fn encode(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TranscodeError> {
        let (width, height) = img.dimensions();
        if width > WEBP_MAX_DIMENSION || height > WEBP_MAX_DIMENSION {
            return Err(TranscodeError::Encode(format!(
                "{}x{} exceeds the WebP limit of {}px",
                width, height, WEBP_MAX_DIMENSION
            )));
        }

        // Convert to RGBA for WebP encoding
        let rgba_img = img.to_rgba8();

        let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
        let webp_data = encoder
            .encode_simple(false, f32::from(quality.min(100)))
            .map_err(|e| TranscodeError::Encode(format!("{:?}", e)))?;

        Ok(webp_data.to_vec())
    }

    /// Check if image has meaningful alpha channel (not fully opaque)
    pub fn has_meaningful_alpha(img: &DynamicImage) -> bool {
        match img {
            DynamicImage::ImageRgba8(_)
            | DynamicImage::ImageRgba16(_)
            | DynamicImage::ImageRgba32F(_)
            | DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLumaA16(_) => {
                let rgba = img.to_rgba8();
                let (width, height) = img.dimensions();

                // Sample every 10th pixel
                for y in (0..height).step_by(10) {
                    for x in (0..width).step_by(10) {
                        if rgba.get_pixel(x, y)[3] < 255 {
                            return true;
                        }
                    }
                }
                false
            }
            _ => false,
        }
    }
}
