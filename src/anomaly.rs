//! Gait anomaly classification over recent stride lengths.
//!
//! Two strategies run side by side and are reported separately:
//!
//! - **Range**: bounds are `mean ± 0.5 * (max - min)`. Used when annotating
//!   a full recording after the fact.
//! - **Z-score**: `z = (length - mean) / std`, alerting outside the
//!   configured bounds. Used for live, in-session alerts.
//!
//! They use different dispersion statistics and can disagree on the same
//! stride, so neither is derived from the other.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::Moments;

/// Fraction of the window range added on either side of the mean
const RANGE_SPREAD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GaitVerdict {
    TooSlow,
    Normal,
    TooFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeAssessment {
    pub verdict: GaitVerdict,
    pub mean: f64,
    pub range: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreAssessment {
    pub verdict: GaitVerdict,
    pub mean: f64,
    pub std_dev: f64,
    pub z_score: f64,
}

/// Result of classifying one stride
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    /// Not enough strides yet for a verdict
    InsufficientData { collected: usize, required: usize },
    Assessed {
        range: RangeAssessment,
        z_score: ZScoreAssessment,
    },
}

impl Classification {
    pub fn range(&self) -> Option<&RangeAssessment> {
        match self {
            Classification::Assessed { range, .. } => Some(range),
            Classification::InsufficientData { .. } => None,
        }
    }

    pub fn z_score(&self) -> Option<&ZScoreAssessment> {
        match self {
            Classification::Assessed { z_score, .. } => Some(z_score),
            Classification::InsufficientData { .. } => None,
        }
    }

    /// True when both strategies produced a verdict and those verdicts differ
    pub fn strategies_disagree(&self) -> bool {
        match self {
            Classification::Assessed { range, z_score } => range.verdict != z_score.verdict,
            Classification::InsufficientData { .. } => false,
        }
    }
}

/// Range-based strategy. The last element of `window` is the stride being classified.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeStrategy;

impl RangeStrategy {
    pub fn classify(&self, window: &[f64]) -> Option<RangeAssessment> {
        let &current = window.last()?;
        let m = Moments::of(window)?;
        let range = m.range();
        let lower_bound = m.mean - RANGE_SPREAD * range;
        let upper_bound = m.mean + RANGE_SPREAD * range;

        let verdict = if current < lower_bound {
            GaitVerdict::TooSlow
        } else if current > upper_bound {
            GaitVerdict::TooFast
        } else {
            GaitVerdict::Normal
        };

        Some(RangeAssessment {
            verdict,
            mean: m.mean,
            range,
            lower_bound,
            upper_bound,
        })
    }
}

/// Z-score strategy. The last element of `window` is the stride being classified.
#[derive(Debug, Clone, Copy)]
pub struct ZScoreStrategy {
    pub lower: f64,
    pub upper: f64,
}

impl ZScoreStrategy {
    pub fn new((lower, upper): (f64, f64)) -> Self {
        ZScoreStrategy { lower, upper }
    }

    pub fn classify(&self, window: &[f64]) -> Option<ZScoreAssessment> {
        let &current = window.last()?;
        let m = Moments::of(window)?;
        let z_score = if m.std_dev > 0.0 {
            (current - m.mean) / m.std_dev
        } else {
            0.0
        };

        let verdict = if z_score < self.lower {
            GaitVerdict::TooSlow
        } else if z_score > self.upper {
            GaitVerdict::TooFast
        } else {
            GaitVerdict::Normal
        };

        Some(ZScoreAssessment {
            verdict,
            mean: m.mean,
            std_dev: m.std_dev,
            z_score,
        })
    }
}

impl Default for ZScoreStrategy {
    fn default() -> Self {
        Self::new((-1.5, 1.5))
    }
}

/// Keeps the most recent stride lengths and runs both strategies on each new one
#[derive(Debug, Clone)]
pub struct GaitAnomalyDetector {
    lengths: VecDeque<f64>,
    window: usize,
    range: RangeStrategy,
    z_score: ZScoreStrategy,
}

impl GaitAnomalyDetector {
    pub fn new(window: usize, z_score_bounds: (f64, f64)) -> Self {
        GaitAnomalyDetector {
            lengths: VecDeque::with_capacity(window),
            window,
            range: RangeStrategy,
            z_score: ZScoreStrategy::new(z_score_bounds),
        }
    }

    /// Record a stride length and classify it against the window it completes
    pub fn observe(&mut self, step_length: f64) -> Classification {
        self.lengths.push_back(step_length);
        while self.lengths.len() > self.window {
            self.lengths.pop_front();
        }

        if self.lengths.len() < self.window {
            return Classification::InsufficientData {
                collected: self.lengths.len(),
                required: self.window,
            };
        }

        let window: Vec<f64> = self.lengths.iter().copied().collect();
        match (self.range.classify(&window), self.z_score.classify(&window)) {
            (Some(range), Some(z_score)) => {
                log::debug!(
                    "Step length: {:.3}, Mean: {:.3}, StdDev: {:.3}, Z-score: {:.2}",
                    step_length,
                    z_score.mean,
                    z_score.std_dev,
                    z_score.z_score
                );
                Classification::Assessed { range, z_score }
            }
            _ => Classification::InsufficientData {
                collected: self.lengths.len(),
                required: self.window,
            },
        }
    }

    pub fn reset(&mut self) {
        self.lengths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_insufficient_data_until_window_full() {
        let mut detector = GaitAnomalyDetector::new(8, (-1.5, 1.5));
        for i in 1..8 {
            assert_eq!(
                detector.observe(0.5),
                Classification::InsufficientData {
                    collected: i,
                    required: 8
                }
            );
        }
        assert!(matches!(detector.observe(0.5), Classification::Assessed { .. }));
    }

    #[test]
    fn test_outlier_stride_flagged_by_both() {
        let mut detector = GaitAnomalyDetector::new(8, (-1.5, 1.5));
        let lengths = [0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 5.0];
        let results: Vec<Classification> = lengths.iter().map(|&l| detector.observe(l)).collect();

        let eighth = results[7];
        assert_eq!(eighth.range().unwrap().verdict, GaitVerdict::Normal);
        assert_eq!(eighth.z_score().unwrap().verdict, GaitVerdict::Normal);
        assert_eq!(eighth.z_score().unwrap().z_score, 0.0);

        let ninth = results[8];
        let range = ninth.range().unwrap();
        let z = ninth.z_score().unwrap();
        assert_eq!(range.verdict, GaitVerdict::TooFast);
        assert_eq!(z.verdict, GaitVerdict::TooFast);
        assert_relative_eq!(range.mean, 1.0625);
        assert_relative_eq!(range.range, 4.5);
        assert_relative_eq!(z.z_score, 3.9375 / 2.21484375f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_short_stride_is_too_slow() {
        let window = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.1];
        assert_eq!(RangeStrategy.classify(&window).unwrap().verdict, GaitVerdict::TooSlow);
        assert_eq!(
            ZScoreStrategy::default().classify(&window).unwrap().verdict,
            GaitVerdict::TooSlow
        );
    }

    #[test]
    fn test_strategies_can_disagree() {
        // Range upper bound: 1.0125 + 0.5 * 0.5 = 1.2625; z of 1.3 is about 1.34
        let window = [0.8, 1.2, 0.8, 1.2, 0.8, 1.2, 0.8, 1.3];
        let range = RangeStrategy.classify(&window).unwrap();
        let z = ZScoreStrategy::default().classify(&window).unwrap();
        assert_eq!(range.verdict, GaitVerdict::TooFast);
        assert_eq!(z.verdict, GaitVerdict::Normal);

        let classification = Classification::Assessed { range, z_score: z };
        assert!(classification.strategies_disagree());
    }

    #[test]
    fn test_empty_window() {
        assert!(RangeStrategy.classify(&[]).is_none());
        assert!(ZScoreStrategy::default().classify(&[]).is_none());
    }

    #[test]
    fn test_reset_restarts_baseline() {
        let mut detector = GaitAnomalyDetector::new(2, (-1.5, 1.5));
        detector.observe(1.0);
        assert!(matches!(detector.observe(1.0), Classification::Assessed { .. }));
        detector.reset();
        assert!(matches!(
            detector.observe(1.0),
            Classification::InsufficientData { collected: 1, .. }
        ));
    }
}
