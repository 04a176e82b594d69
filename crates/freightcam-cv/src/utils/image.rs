//! Image processing utilities built on the image crate

use crate::Result;
use anyhow::Context;
use image::{imageops::FilterType, DynamicImage, GrayImage, RgbImage};
use std::path::Path;

/// Image utility functions
pub struct ImageUtils;

impl ImageUtils {
    /// Load image from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        image::open(&path).with_context(|| format!("Failed to open image: {:?}", path.as_ref()))
    }

    /// Size of a `width` x `height` image after uniform scaling, rounded to
    /// the nearest pixel and never below 1.
    pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
        let scale_axis = |v: u32| ((v as f64 * scale).round() as u32).max(1);
        (scale_axis(width), scale_axis(height))
    }

    /// Uniformly resize a grayscale image with bilinear filtering
    pub fn resize_by(image: &GrayImage, scale: f64) -> GrayImage {
        if (scale - 1.0).abs() < f64::EPSILON {
            return image.clone();
        }
        let (width, height) = Self::scaled_dimensions(image.width(), image.height(), scale);
        image::imageops::resize(image, width, height, FilterType::Triangle)
    }

    /// Save an RGB image, creating the parent directory if needed
    pub fn save_rgb<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }

        image
            .save(path)
            .with_context(|| format!("Failed to save image: {:?}", path))
    }
}
