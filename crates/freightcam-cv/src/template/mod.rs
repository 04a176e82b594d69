//! Template matching module

pub mod loader;
pub mod matcher;

pub use loader::{TemplateLoadError, TemplateLoader};
pub use matcher::TemplateMatcher;

use crate::bbox::BBox;
use freightcam_core::Label;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Grayscale reference image for one label
#[derive(Debug, Clone)]
pub struct Template {
    pub label: Label,
    pub image: GrayImage,
    pub path: Option<PathBuf>,
}

impl Template {
    pub fn new(label: Label, image: GrayImage) -> Self {
        Self {
            label,
            image,
            path: None,
        }
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Template matching method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMethod {
    /// Normalized cross-correlation without mean removal
    CCorrNormed,
    /// Zero-mean normalized cross-correlation (robust to brightness and contrast)
    CCoeffNormed,
    /// Normalized squared difference (inverted: lower is better)
    SqDiffNormed,
}

impl MatchingMethod {
    pub fn is_inverted(&self) -> bool {
        matches!(self, MatchingMethod::SqDiffNormed)
    }
}

/// Largest accepted frame scale factor
pub const MAX_SCALE_FACTOR: f64 = 4.0;

/// Multi-scale matcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub method: MatchingMethod,
    pub scale_min: f64,
    pub scale_max: f64,
    pub scale_count: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            method: MatchingMethod::CCoeffNormed,
            scale_min: 0.5,
            scale_max: 1.5,
            scale_count: 5,
        }
    }
}

impl MatcherConfig {
    /// Evenly spaced frame scale factors from `scale_min` to `scale_max`
    /// inclusive.
    pub fn scale_factors(&self) -> Vec<f64> {
        match self.scale_count {
            0 => Vec::new(),
            1 => vec![self.scale_min],
            count => {
                let step = (self.scale_max - self.scale_min) / (count - 1) as f64;
                let mut scales: Vec<f64> = (0..count)
                    .map(|i| self.scale_min + step * i as f64)
                    .collect();
                scales[count - 1] = self.scale_max;
                scales
            }
        }
    }
}

/// Best match of one template in one frame.
///
/// `location` and `size` are in the coordinates of the original frame; the
/// frame was resized by `scale` when the match was found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: f64,
    pub location: (u32, u32),
    pub size: (u32, u32),
    pub scale: f64,
}

impl MatchResult {
    /// Map a match found in a frame resized by `scale` back to frame coordinates.
    pub fn from_scaled(score: f64, scaled_location: (u32, u32), template_size: (u32, u32), scale: f64) -> Self {
        let unscale = |v: u32| (v as f64 / scale).round() as u32;
        Self {
            score,
            location: (unscale(scaled_location.0), unscale(scaled_location.1)),
            size: (
                unscale(template_size.0).max(1),
                unscale(template_size.1).max(1),
            ),
            scale,
        }
    }

    pub fn to_bbox(&self, label: Label) -> BBox {
        BBox::new(
            self.location.0 as i32,
            self.location.1 as i32,
            self.size.0,
            self.size.1,
            self.score,
            label,
        )
    }
}
