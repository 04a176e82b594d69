//! High-level detection module

pub mod acquisition;
pub mod config;
pub mod counter;
pub mod detector;

pub use acquisition::{AcquisitionLoop, Clock, CycleOutcome, LoopState, QuitSignal, SystemClock};
pub use config::{CounterConfig, WatchConfig};
pub use counter::{CountDecision, CounterState, DebouncedCounter, LabelCounter};
pub use detector::{CycleReport, Detection, DualDetector};
