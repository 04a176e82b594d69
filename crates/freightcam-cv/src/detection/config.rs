//! Detection configuration

use crate::template::loader::DEFAULT_MAX_TEMPLATE_WIDTH;
use crate::template::{MatcherConfig, MAX_SCALE_FACTOR};
use crate::Result;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CAMERA_URL: &str = "http://10.124.211.137/capture";
const DEFAULT_FETCH_TIMEOUT_SECS: f64 = 5.0;
const DEFAULT_BACKOFF_SECS: f64 = 2.0;

/// Main configuration of the camera counter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub camera_url: String,
    pub template_a: PathBuf,
    pub template_b: PathBuf,
    pub max_template_width: u32,
    pub matcher: MatcherConfig,
    pub counter: CounterConfig,
    pub fetch_timeout_secs: f64,
    pub backoff_secs: f64,
    pub output: PathBuf,
}

/// Debounced counting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Minimum match score, exclusive
    pub threshold: f64,
    /// Minimum time between two counts of the same label, exclusive
    pub cooldown_secs: f64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            camera_url: DEFAULT_CAMERA_URL.to_string(),
            template_a: "objectA.png".into(),
            template_b: "objectB.png".into(),
            max_template_width: DEFAULT_MAX_TEMPLATE_WIDTH,
            matcher: MatcherConfig::default(),
            counter: CounterConfig::default(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            backoff_secs: DEFAULT_BACKOFF_SECS,
            output: "outputs/latest.png".into(),
        }
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.65,
            cooldown_secs: 2.0,
        }
    }
}

impl WatchConfig {
    /// Read a JSON config file; fields it omits keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: WatchConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let threshold = self.counter.threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            bail!("threshold must be within [-1, 1], got {}", threshold);
        }
        for (name, secs) in [
            ("cooldown_secs", self.counter.cooldown_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("backoff_secs", self.backoff_secs),
        ] {
            if Duration::try_from_secs_f64(secs).is_err() {
                bail!("{} must be a non-negative number of seconds, got {}", name, secs);
            }
        }
        if self.matcher.scale_count == 0 {
            bail!("scale_count must be at least 1");
        }
        let (scale_min, scale_max) = (self.matcher.scale_min, self.matcher.scale_max);
        if !(scale_min > 0.0 && scale_min <= scale_max && scale_max <= MAX_SCALE_FACTOR) {
            bail!(
                "scales must satisfy 0 < scale_min <= scale_max <= {}, got {}..{}",
                MAX_SCALE_FACTOR,
                scale_min,
                scale_max
            );
        }
        if self.max_template_width == 0 {
            bail!("max_template_width must be positive");
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.fetch_timeout_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    pub fn backoff(&self) -> Duration {
        Duration::try_from_secs_f64(self.backoff_secs)
            .unwrap_or(Duration::from_secs_f64(DEFAULT_BACKOFF_SECS))
    }
}

impl CounterConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_secs).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() -> Result<()> {
        let config = WatchConfig::default();
        config.validate()?;
        assert_eq!(config.counter.threshold, 0.65);
        assert_eq!(config.counter.cooldown(), Duration::from_secs(2));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(config.backoff(), Duration::from_secs(2));
        assert_eq!(config.max_template_width, 200);
        Ok(())
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> Result<()> {
        let config: WatchConfig = serde_json::from_str(
            r#"{"camera_url": "http://cam.local/capture", "counter": {"threshold": 0.8}}"#,
        )?;
        assert_eq!(config.camera_url, "http://cam.local/capture");
        assert_eq!(config.counter.threshold, 0.8);
        assert_eq!(config.counter.cooldown_secs, 2.0);
        assert_eq!(config.matcher.scale_count, 5);
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = WatchConfig::default();
        config.counter.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::default();
        config.backoff_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::default();
        config.matcher.scale_min = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_durations_and_scales_rejected() {
        let mut config = WatchConfig::default();
        config.fetch_timeout_secs = 1e20;
        assert!(config.validate().is_err());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));

        let mut config = WatchConfig::default();
        config.counter.cooldown_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::default();
        config.matcher.scale_max = 1e9;
        assert!(config.validate().is_err());

        let mut config = WatchConfig::default();
        config.matcher.scale_max = MAX_SCALE_FACTOR;
        assert!(config.validate().is_ok());
    }
}
