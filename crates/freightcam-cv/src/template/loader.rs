//! Template loading utilities

use super::Template;
use freightcam_core::Label;
use image::{imageops::FilterType, GrayImage};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Templates wider than this are shrunk on load
pub const DEFAULT_MAX_TEMPLATE_WIDTH: u32 = 200;

#[derive(Debug, Error)]
pub enum TemplateLoadError {
    #[error("could not read template {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("template {path:?} has no pixels")]
    Empty { path: PathBuf },
}

/// Loads reference images and normalizes their size
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    max_width: u32,
}

impl TemplateLoader {
    pub fn new(max_width: u32) -> Self {
        Self {
            max_width: max_width.max(1),
        }
    }

    /// Load a template as grayscale, proportionally shrinking it to `max_width`
    pub fn load<P: AsRef<Path>>(&self, label: Label, path: P) -> Result<Template, TemplateLoadError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| TemplateLoadError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .to_luma8();

        if image.width() == 0 || image.height() == 0 {
            return Err(TemplateLoadError::Empty {
                path: path.to_path_buf(),
            });
        }

        let image = self.normalize(image);
        info!(
            "Loaded template {} from {:?} ({}x{})",
            label,
            path,
            image.width(),
            image.height()
        );

        Ok(Template::new(label, image).with_path(path.to_path_buf()))
    }

    /// Load a template, logging and discarding any failure so detection for
    /// that label is simply disabled
    pub fn load_optional<P: AsRef<Path>>(&self, label: Label, path: P) -> Option<Template> {
        match self.load(label, path) {
            Ok(template) => Some(template),
            Err(e) => {
                warn!("Detection for object {} disabled: {}", label, e);
                None
            }
        }
    }

    /// Shrink to `max_width` keeping the aspect ratio
    pub fn normalize(&self, image: GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        if width <= self.max_width {
            return image;
        }

        let scale = self.max_width as f64 / width as f64;
        let new_height = ((height as f64 * scale).round() as u32).max(1);
        image::imageops::resize(&image, self.max_width, new_height, FilterType::Triangle)
    }
}

impl Default for TemplateLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEMPLATE_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, RgbImage};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("freightcam-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_wide_template_shrunk() {
        let loader = TemplateLoader::default();
        let shrunk = loader.normalize(GrayImage::from_pixel(400, 100, Luma([7])));
        assert_eq!(shrunk.dimensions(), (200, 50));

        let odd = loader.normalize(GrayImage::new(300, 101));
        assert_eq!(odd.dimensions(), (200, 67));
    }

    #[test]
    fn test_narrow_template_untouched() {
        let loader = TemplateLoader::default();
        assert_eq!(loader.normalize(GrayImage::new(200, 300)).dimensions(), (200, 300));
        assert_eq!(loader.normalize(GrayImage::new(40, 30)).dimensions(), (40, 30));
    }

    #[test]
    fn test_load_converts_to_grayscale() {
        let path = temp_path("objectA.png");
        RgbImage::from_pixel(250, 50, image::Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let template = TemplateLoader::default().load(Label::A, &path).unwrap();
        assert_eq!(template.label, Label::A);
        assert_eq!(template.dimensions(), (200, 40));
        assert_eq!(template.image.get_pixel(10, 10)[0], 255);
        assert_eq!(template.path.as_deref(), Some(path.as_path()));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_absent() {
        let loader = TemplateLoader::default();
        let path = temp_path("does-not-exist.png");

        assert!(matches!(
            loader.load(Label::B, &path),
            Err(TemplateLoadError::Read { .. })
        ));
        assert!(loader.load_optional(Label::B, &path).is_none());
    }
}
