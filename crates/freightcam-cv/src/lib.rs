//! Freightcam Computer Vision Library
//!
//! Template loading, multi-scale matching and debounced counting of the two
//! tracked objects, plus the camera polling loop that drives them.

pub mod bbox;
pub mod detection;
pub mod overlay;
pub mod source;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use bbox::BBox;
pub use detection::{
    AcquisitionLoop, CountDecision, CounterState, CycleOutcome, DebouncedCounter, Detection,
    DualDetector, QuitSignal, WatchConfig,
};
pub use source::{FetchError, FrameSource, HttpFrameSource};
pub use template::{MatchResult, Template, TemplateLoader, TemplateMatcher};

// Error handling
pub type Result<T> = anyhow::Result<T>;
