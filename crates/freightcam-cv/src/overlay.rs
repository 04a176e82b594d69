//! Overlay rendering and presentation of the latest annotated frame

use crate::bbox::BBox;
use crate::detection::detector::CycleReport;
use crate::utils::ImageUtils;
use crate::Result;
use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context};
use freightcam_core::Label;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::debug;

const BOX_THICKNESS: i32 = 2;

/// Draws detection boxes and counter text onto a frame
#[derive(Default)]
pub struct OverlayRenderer {
    font: Option<FontVec>,
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable counter text using a TrueType/OpenType font file
    pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read font: {:?}", path))?;
        let font =
            FontVec::try_from_vec(bytes).map_err(|_| anyhow!("Invalid font file: {:?}", path))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn render(&self, frame: &RgbImage, report: &CycleReport) -> RgbImage {
        let mut output = frame.clone();

        for bbox in report.boxes() {
            draw_box(&mut output, &bbox);
        }

        if let Some(font) = &self.font {
            for (row, label) in Label::ALL.into_iter().enumerate() {
                let (r, g, b) = BBox::label_color(label);
                let text = format!("{} Count: {}", label, report.counts.get(label));
                draw_text_mut(
                    &mut output,
                    Rgb([r, g, b]),
                    10,
                    12 + 30 * row as i32,
                    PxScale::from(22.0),
                    font,
                    &text,
                );
            }
        }

        output
    }
}

fn draw_box(image: &mut RgbImage, bbox: &BBox) {
    let (r, g, b) = bbox.color;
    let rect = bbox.to_rect();
    for inset in 0..BOX_THICKNESS {
        let width = rect.width() as i32 - 2 * inset;
        let height = rect.height() as i32 - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        let inner = Rect::at(rect.left() + inset, rect.top() + inset)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, inner, Rgb([r, g, b]));
    }
}

/// Receives every annotated frame produced by the acquisition loop
pub trait Presenter {
    fn present(&mut self, frame: &RgbImage, report: &CycleReport) -> Result<()>;
}

/// Keeps the most recent overlay on disk so it can be watched in any image
/// viewer
pub struct SnapshotPresenter {
    renderer: OverlayRenderer,
    output: PathBuf,
}

impl SnapshotPresenter {
    pub fn new(renderer: OverlayRenderer, output: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Presenter for SnapshotPresenter {
    fn present(&mut self, frame: &RgbImage, report: &CycleReport) -> Result<()> {
        let annotated = self.renderer.render(frame, report);
        ImageUtils::save_rgb(&annotated, &self.output)?;
        debug!("Overlay saved: {:?}", self.output);
        Ok(())
    }
}
