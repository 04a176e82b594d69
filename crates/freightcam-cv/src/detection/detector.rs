//! Matches both templates against a frame and feeds the debounced counter

use super::config::WatchConfig;
use super::counter::{CountDecision, CounterState, DebouncedCounter};
use crate::bbox::BBox;
use crate::template::{MatchResult, Template, TemplateLoader, TemplateMatcher};
use crate::Result;
use anyhow::Context;
use freightcam_core::{Counts, Label};
use image::GrayImage;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Outcome for one label in one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: Label,
    pub result: Option<MatchResult>,
    pub decision: CountDecision,
}

impl Detection {
    /// Box to draw, present only for qualifying matches
    pub fn bbox(&self) -> Option<BBox> {
        match &self.result {
            Some(result) if self.decision.is_visible() => Some(result.to_bbox(self.label)),
            _ => None,
        }
    }
}

/// Everything one detection cycle produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub detections: Vec<Detection>,
    pub counts: Counts,
    pub processing_time_ms: u64,
}

impl CycleReport {
    pub fn boxes(&self) -> impl Iterator<Item = BBox> + '_ {
        self.detections.iter().filter_map(Detection::bbox)
    }
}

/// Detector for the two tracked objects. A label without a template is
/// skipped rather than failing the whole cycle.
pub struct DualDetector {
    templates: Vec<Template>,
    matcher: TemplateMatcher,
    counter: DebouncedCounter,
    state: CounterState,
}

impl DualDetector {
    pub fn new(templates: Vec<Template>, matcher: TemplateMatcher, counter: DebouncedCounter) -> Self {
        Self {
            templates,
            matcher,
            counter,
            state: CounterState::new(),
        }
    }

    /// Build from configuration, loading both templates from disk
    pub fn from_config(config: &WatchConfig) -> Self {
        let loader = TemplateLoader::new(config.max_template_width);
        let templates = [
            (Label::A, config.template_a.as_path()),
            (Label::B, config.template_b.as_path()),
        ]
        .into_iter()
        .filter_map(|(label, path)| loader.load_optional(label, path))
        .collect();

        Self::new(
            templates,
            TemplateMatcher::new(config.matcher.clone()),
            DebouncedCounter::from(&config.counter),
        )
    }

    pub fn active_labels(&self) -> Vec<Label> {
        self.templates.iter().map(|t| t.label).collect()
    }

    pub fn counts(&self) -> Counts {
        self.state.counts()
    }

    /// Match every loaded template against `frame` and update the counters
    pub fn process(&mut self, frame: &GrayImage, now: Instant) -> CycleReport {
        let start_time = Instant::now();

        let detections = self
            .templates
            .iter()
            .map(|template| {
                let result = self.matcher.find_match(frame, template);
                let decision =
                    self.counter
                        .maybe_count(&mut self.state, template.label, result.as_ref(), now);
                Detection {
                    label: template.label,
                    result,
                    decision,
                }
            })
            .collect();

        CycleReport {
            detections,
            counts: self.state.counts(),
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        }
    }

    /// Export a cycle report as pretty JSON
    pub fn export_json(report: &CycleReport, output_path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(report).context("Failed to serialize detection results")?;

        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write JSON to: {:?}", output_path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::time::Duration;

    fn checkerboard(size: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Luma([230])
            } else {
                Luma([20])
            }
        })
    }

    fn stripes(size: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, _| Luma([(x * 37 % 251) as u8]))
    }

    fn scene() -> GrayImage {
        let mut frame = GrayImage::from_pixel(96, 96, Luma([128]));
        image::imageops::replace(&mut frame, &checkerboard(24, 6), 8, 60);
        frame
    }

    #[test]
    fn test_missing_template_is_skipped() {
        let config = WatchConfig {
            template_a: "/nonexistent/objectA.png".into(),
            template_b: "/nonexistent/objectB.png".into(),
            ..Default::default()
        };
        let mut detector = DualDetector::from_config(&config);
        assert!(detector.active_labels().is_empty());

        let report = detector.process(&scene(), Instant::now());
        assert!(report.detections.is_empty());
        assert_eq!(report.counts, Counts::default());
    }

    #[test]
    fn test_process_counts_and_draws() {
        let templates = vec![
            Template::new(Label::A, checkerboard(24, 6)),
            Template::new(Label::B, stripes(24)),
        ];
        let mut detector =
            DualDetector::new(templates, TemplateMatcher::default(), DebouncedCounter::default());
        let start = Instant::now();

        let first = detector.process(&scene(), start);
        assert_eq!(first.detections[0].decision, CountDecision::Counted(1));
        let bbox = first.detections[0].bbox().unwrap();
        assert_eq!((bbox.x, bbox.y), (8, 60));
        assert_eq!(first.counts.a, 1);

        // Object B is absent from the scene
        assert_eq!(first.detections[1].decision, CountDecision::Ignored);
        assert!(first.detections[1].bbox().is_none());

        let second = detector.process(&scene(), start + Duration::from_millis(500));
        assert_eq!(second.detections[0].decision, CountDecision::Cooldown);
        assert_eq!(second.boxes().count(), 1);
        assert_eq!(second.counts.a, 1);

        let third = detector.process(&scene(), start + Duration::from_secs(3));
        assert_eq!(third.detections[0].decision, CountDecision::Counted(2));
        assert_eq!(detector.counts(), Counts { a: 2, b: 0 });
    }
}
