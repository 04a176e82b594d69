//! Bounding boxes drawn around matched templates.

use freightcam_core::Label;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

/// A detection rectangle in frame coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub confidence: f64,
    pub label: Label,
    pub color: (u8, u8, u8),
}

impl BBox {
    pub fn new(x: i32, y: i32, width: u32, height: u32, confidence: f64, label: Label) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
            label,
            color: Self::label_color(label),
        }
    }

    /// RGB color used for a label: A green, B blue.
    pub fn label_color(label: Label) -> (u8, u8, u8) {
        match label {
            Label::A => (0, 255, 0),
            Label::B => (0, 0, 255),
        }
    }

    /// Convert to an imageproc rectangle; degenerate sizes are widened to 1px.
    pub fn to_rect(&self) -> Rect {
        Rect::at(self.x, self.y).of_size(self.width.max(1), self.height.max(1))
    }
}
