//! Debounced per-label counting

use super::config::CounterConfig;
use crate::template::MatchResult;
use freightcam_core::{Counts, Label};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounter {
    pub count: u64,
    /// Time of the last counted detection; `None` until the first one
    pub last_seen: Option<Instant>,
}

/// Running totals for both labels, owned by whoever drives the counter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterState {
    a: LabelCounter,
    b: LabelCounter,
}

impl CounterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: Label) -> &LabelCounter {
        match label {
            Label::A => &self.a,
            Label::B => &self.b,
        }
    }

    fn get_mut(&mut self, label: Label) -> &mut LabelCounter {
        match label {
            Label::A => &mut self.a,
            Label::B => &mut self.b,
        }
    }

    pub fn counts(&self) -> Counts {
        Counts {
            a: self.a.count,
            b: self.b.count,
        }
    }
}

/// What the counter did with one match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "total", rename_all = "snake_case")]
pub enum CountDecision {
    /// No match, or the score did not exceed the threshold
    Ignored,
    /// Qualifying match inside the cooldown window
    Cooldown,
    /// Qualifying match that was counted; carries the new total
    Counted(u64),
}

impl CountDecision {
    /// Qualifying matches are drawn whether or not they were counted
    pub fn is_visible(&self) -> bool {
        !matches!(self, CountDecision::Ignored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebouncedCounter {
    threshold: f64,
    cooldown: Duration,
}

impl DebouncedCounter {
    pub fn new(threshold: f64, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
        }
    }

    pub fn qualifies(&self, result: &MatchResult) -> bool {
        result.score > self.threshold
    }

    /// Count `label` if the match beats the threshold and more than the
    /// cooldown has passed since its last count.
    pub fn maybe_count(
        &self,
        state: &mut CounterState,
        label: Label,
        result: Option<&MatchResult>,
        now: Instant,
    ) -> CountDecision {
        match result {
            Some(result) if self.qualifies(result) => {}
            _ => return CountDecision::Ignored,
        }

        let entry = state.get_mut(label);
        let cooled_down = entry
            .last_seen
            .map_or(true, |last| now.saturating_duration_since(last) > self.cooldown);
        if !cooled_down {
            return CountDecision::Cooldown;
        }

        entry.count += 1;
        entry.last_seen = Some(now);
        info!("Detected object {}! Total: {}", label, entry.count);
        CountDecision::Counted(entry.count)
    }
}

impl From<&CounterConfig> for DebouncedCounter {
    fn from(config: &CounterConfig) -> Self {
        Self::new(config.threshold, config.cooldown())
    }
}

impl Default for DebouncedCounter {
    fn default() -> Self {
        Self::from(&CounterConfig::default())
    }
}
