use deriva_core::{DerivativeSpec, FitMode};
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};

use crate::compression::WebpEncoder;

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Target size for an aspect-preserving fit inside the given bounds.
    ///
    /// A missing bound does not constrain. With `without_enlargement` the
    /// scale never exceeds 1.
    pub fn inside_dimensions(
        orig_width: u32,
        orig_height: u32,
        max_width: Option<u32>,
        max_height: Option<u32>,
        without_enlargement: bool,
    ) -> (u32, u32) {
        let scale_w = max_width.map(|w| w as f64 / orig_width.max(1) as f64);
        let scale_h = max_height.map(|h| h as f64 / orig_height.max(1) as f64);

        let mut scale = match (scale_w, scale_h) {
            (Some(w), Some(h)) => w.min(h),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => 1.0,
        };
        if without_enlargement {
            scale = scale.min(1.0);
        }

        let width = (orig_width as f64 * scale).round() as u32;
        let height = (orig_height as f64 * scale).round() as u32;
        (width.max(1), height.max(1))
    }

    /// Scale to fit within the bounds, preserving aspect ratio.
    pub fn fit_inside(img: &DynamicImage, spec: &DerivativeSpec) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = Self::inside_dimensions(
            orig_width,
            orig_height,
            spec.width,
            spec.height,
            spec.without_enlargement,
        );

        if (width, height) == (orig_width, orig_height) {
            return img.clone();
        }

        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Scale and center-crop to exactly fill the box.
    ///
    /// When the spec carries a background and the source has transparency,
    /// the result is composited onto a canvas of that colour.
    pub fn fit_cover(img: &DynamicImage, spec: &DerivativeSpec) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let width = spec.width.unwrap_or(orig_width).max(1);
        let height = spec.height.unwrap_or(orig_height).max(1);

        let filter = Self::select_filter(orig_width, orig_height, width, height);
        let filled = img.resize_to_fill(width, height, filter);

        match spec.background {
            Some(background) if WebpEncoder::has_meaningful_alpha(&filled) => {
                let canvas_img = RgbaImage::from_pixel(width, height, Rgba(background.to_array()));
                let mut canvas = DynamicImage::ImageRgba8(canvas_img);
                imageops::overlay(&mut canvas, &filled, 0, 0);
                canvas
            }
            _ => filled,
        }
    }

    /// Apply the geometry of `spec` to `img`.
    pub fn apply(img: &DynamicImage, spec: &DerivativeSpec) -> DynamicImage {
        match spec.fit_mode {
            FitMode::Cover => Self::fit_cover(img, spec),
            FitMode::Inside => Self::fit_inside(img, spec),
        }
    }
}
