pub mod stats;

pub use stats::*;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::anomaly::Classification;
use crate::error::{Result, StepTrackerError};

/// Raw triaxial accelerometer sample (source clock, seconds)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(timestamp: f64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp, x, y, z }
    }

    /// Euclidean norm of (x, y, z)
    pub fn magnitude(&self) -> f64 {
        Vector3::new(self.x, self.y, self.z).norm()
    }

    /// Reject samples carrying NaN or infinite components
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("timestamp", self.timestamp),
            ("x", self.x),
            ("y", self.y),
            ("z", self.z),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(StepTrackerError::InvalidSample {
                    timestamp: self.timestamp,
                    reason: format!("{} is not finite ({})", name, value),
                });
            }
        }
        Ok(())
    }
}

/// One point of the smoothed magnitude series.
/// `timestamp` is elapsed seconds since the first accepted sample, snapped to the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothedSample {
    pub timestamp: f64,
    pub magnitude: f64,
}

/// Stride estimate attached to every step after the first
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrideMetrics {
    pub step_length: f64, // meters
    pub velocity: f64,    // m/s
    pub interval: f64,    // seconds since previous step
}

/// Confirmed step event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based count of steps in the current recording
    pub number: u64,
    pub timestamp: f64,
    pub peak_magnitude: f64,
    pub stride: Option<StrideMetrics>,
    pub classification: Classification,
}

impl Step {
    pub fn step_length(&self) -> Option<f64> {
        self.stride.map(|s| s.step_length)
    }

    pub fn velocity(&self) -> Option<f64> {
        self.stride.map(|s| s.velocity)
    }
}

/// Per-stride anomaly verdict, published on its own stream for alerting consumers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepClassification {
    pub step_number: u64,
    pub timestamp: f64,
    pub step_length: f64,
    pub classification: Classification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_magnitude() {
        let sample = Sample::new(0.0, 3.0, 4.0, 0.0);
        assert_eq!(sample.magnitude(), 5.0);
    }

    #[test]
    fn test_sample_validation() {
        assert!(Sample::new(0.0, 0.1, 0.2, 9.8).validate().is_ok());

        let err = Sample::new(1.0, f64::NAN, 0.0, 9.8).validate().unwrap_err();
        assert!(matches!(err, StepTrackerError::InvalidSample { .. }));
        assert!(err.to_string().contains("x is not finite"));

        assert!(Sample::new(f64::INFINITY, 0.0, 0.0, 9.8).validate().is_err());
    }
}
