//! Camera polling loop: fetch, match, count, present, back off on failure

use super::detector::{CycleReport, DualDetector};
use crate::overlay::Presenter;
use crate::source::FrameSource;
use crate::Result;
use freightcam_core::Counts;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Time source for the loop, swappable in tests
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared stop flag, checked after every cycle
#[derive(Debug, Clone, Default)]
pub struct QuitSignal(Arc<AtomicBool>);

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Fetching,
    Backoff,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A frame was fetched, matched and presented
    Processed(CycleReport),
    /// The cycle failed; the next step waits out the backoff
    Failed(String),
    /// The backoff elapsed; the next step fetches again
    Resumed,
}

pub struct AcquisitionLoop<S, C, P> {
    source: S,
    clock: C,
    presenter: P,
    detector: DualDetector,
    backoff: Duration,
    state: LoopState,
    failures: u64,
}

impl<S: FrameSource, C: Clock, P: Presenter> AcquisitionLoop<S, C, P> {
    pub fn new(source: S, clock: C, presenter: P, detector: DualDetector, backoff: Duration) -> Self {
        Self {
            source,
            clock,
            presenter,
            detector,
            backoff,
            state: LoopState::Fetching,
            failures: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Perform one state transition
    pub fn step(&mut self) -> CycleOutcome {
        match self.state {
            LoopState::Fetching => match self.cycle() {
                Ok(report) => CycleOutcome::Processed(report),
                Err(e) => {
                    self.failures += 1;
                    error!("Connection error: {:#}", e);
                    self.state = LoopState::Backoff;
                    CycleOutcome::Failed(format!("{:#}", e))
                }
            },
            LoopState::Backoff => {
                self.clock.sleep(self.backoff);
                self.state = LoopState::Fetching;
                CycleOutcome::Resumed
            }
        }
    }

    fn cycle(&mut self) -> Result<CycleReport> {
        let frame = self.source.fetch()?;
        let now = self.clock.now();

        let gray = frame.to_luma8();
        let report = self.detector.process(&gray, now);
        self.presenter.present(&frame.to_rgb8(), &report)?;

        Ok(report)
    }

    /// Run until `quit` is raised, returning the final totals
    pub fn run(&mut self, quit: &QuitSignal) -> Counts {
        info!(
            "Starting camera counter for objects {:?}",
            self.detector.active_labels()
        );

        loop {
            self.step();
            if quit.is_raised() {
                break;
            }
        }

        let counts = self.detector.counts();
        info!(
            "Camera counter stopped: A={}, B={}, failed cycles={}",
            counts.a, counts.b, self.failures
        );
        counts
    }
}
