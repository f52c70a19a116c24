use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, StepTrackerError};

/// Longest look-ahead accepted, in grid ticks
pub const MAX_FUTURE_WINDOW_TICKS: u64 = 10_000;
/// Largest rolling threshold window accepted
pub const MAX_WINDOW_SIZE: usize = 100_000;
/// Slack for float error in the window-to-tick division
const TICK_EPSILON: f64 = 1e-9;

/// Tuning parameters for the step detection pipeline.
///
/// Defaults are tuned for human walking cadence with a phone-class
/// accelerometer (m/s², gravity included). Any subset can be overridden
/// from JSON; missing fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resampling grid (seconds)
    pub sampling_interval: f64,
    /// Look-ahead held back before a sample is released (seconds)
    pub future_window: f64,
    /// Minimum samples before the adaptive threshold replaces the fallback.
    /// The rolling window holds `2 * window_size` values.
    pub window_size: usize,
    /// Minimum time between two confirmed steps (seconds)
    pub min_step_interval: f64,
    /// Absolute floor a peak must clear, also the fallback threshold
    pub min_step_threshold: f64,
    /// Exponential smoothing factor α
    pub smoothing_factor: f64,
    /// Kim's step length coefficient k
    pub kim_coefficient: f64,
    /// Number of stride lengths the anomaly strategies look at
    pub anomaly_window: usize,
    /// (slow, fast) z-score alert bounds
    pub z_score_bounds: (f64, f64),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling_interval: 0.1,
            future_window: 1.0,
            window_size: 15,
            min_step_interval: 0.4,
            min_step_threshold: 7.5,
            smoothing_factor: 0.1,
            kim_coefficient: 0.26,
            anomaly_window: 8,
            z_score_bounds: (-1.5, 1.5),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("sampling_interval", self.sampling_interval),
            ("min_step_interval", self.min_step_interval),
            ("kim_coefficient", self.kim_coefficient),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(StepTrackerError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if !(self.future_window.is_finite() && self.future_window >= 0.0) {
            return Err(StepTrackerError::InvalidConfig(format!(
                "future_window must be non-negative, got {}",
                self.future_window
            )));
        }
        if !self.min_step_threshold.is_finite() {
            return Err(StepTrackerError::InvalidConfig(
                "min_step_threshold must be finite".to_string(),
            ));
        }
        if !(self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0) {
            return Err(StepTrackerError::InvalidConfig(format!(
                "smoothing_factor must be in (0, 1], got {}",
                self.smoothing_factor
            )));
        }
        let ticks = self.future_window_ticks_f64();
        if !(ticks.is_finite() && ticks <= MAX_FUTURE_WINDOW_TICKS as f64) {
            return Err(StepTrackerError::InvalidConfig(format!(
                "future_window of {}s spans more than {} samples",
                self.future_window, MAX_FUTURE_WINDOW_TICKS
            )));
        }
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            return Err(StepTrackerError::InvalidConfig(format!(
                "window_size must be in 1..={}, got {}",
                MAX_WINDOW_SIZE, self.window_size
            )));
        }
        if self.anomaly_window < 2 {
            return Err(StepTrackerError::InvalidConfig(format!(
                "anomaly_window must be at least 2, got {}",
                self.anomaly_window
            )));
        }

        let (lower, upper) = self.z_score_bounds;
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(StepTrackerError::InvalidConfig(format!(
                "z_score_bounds must be finite and ordered, got ({}, {})",
                lower, upper
            )));
        }

        Ok(())
    }

    /// Load overrides from a JSON file and validate the result
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Look-ahead expressed in whole grid ticks, rounded up.
    ///
    /// A grid point is held until at least `future_window` seconds of newer
    /// points exist, so the release lag equals `future_window` only when it
    /// is a multiple of `sampling_interval`.
    pub fn future_window_ticks(&self) -> u64 {
        self.future_window_ticks_f64() as u64
    }

    fn future_window_ticks_f64(&self) -> f64 {
        (self.future_window / self.sampling_interval - TICK_EPSILON)
            .ceil()
            .max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.future_window_ticks(), 10);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.smoothing_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.z_score_bounds = (1.5, -1.5);
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.sampling_interval = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_future_window_rounds_up_to_grid() {
        let mut config = PipelineConfig::default();
        for (window, ticks) in [(0.0, 0), (0.24, 3), (0.25, 3), (0.3, 3), (0.7, 7), (1.0, 10)] {
            config.future_window = window;
            assert_eq!(config.future_window_ticks(), ticks, "future_window {}", window);
        }
    }

    #[test]
    fn test_rejects_oversized_windows() {
        let mut config = PipelineConfig::default();
        config.future_window = 1e300;
        assert!(matches!(config.validate(), Err(StepTrackerError::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.sampling_interval = 1e-300;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.window_size = usize::MAX / 2 + 1;
        assert!(matches!(config.validate(), Err(StepTrackerError::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.window_size = MAX_WINDOW_SIZE;
        config.future_window = MAX_FUTURE_WINDOW_TICKS as f64 * config.sampling_interval;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "min_step_threshold": 9.0, "z_score_bounds": [-2.0, 2.0] }}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.min_step_threshold, 9.0);
        assert_eq!(config.z_score_bounds, (-2.0, 2.0));
        assert_eq!(config.window_size, 15);
    }

    #[test]
    fn test_invalid_json_config_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "anomaly_window": 1 }}"#).unwrap();

        let err = PipelineConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, StepTrackerError::InvalidConfig(_)));
    }
}
