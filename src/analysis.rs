//! Post-hoc annotation of a finished recording.
//!
//! Works on the full smoothed series and the confirmed steps, so every step
//! sees its complete neighbourhood regardless of where it fell in the live
//! stream. Verdicts come from the range strategy.

use serde::{Deserialize, Serialize};

use crate::anomaly::{GaitVerdict, RangeAssessment, RangeStrategy};
use crate::config::PipelineConfig;
use crate::stride::{kim_step_length, NEIGHBORHOOD_RADIUS};
use crate::types::{mean, median, Moments, SmoothedSample, Step};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepAnnotation {
    pub step_number: u64,
    pub timestamp: f64,
    pub interval: f64,
    pub step_length: f64,
    pub velocity: f64,
    /// `None` until enough strides exist to fill the anomaly window
    pub range: Option<RangeAssessment>,
}

impl StepAnnotation {
    pub fn verdict(&self) -> Option<GaitVerdict> {
        self.range.map(|r| r.verdict)
    }
}

/// Index of the step in the smoothed series: first sample at or after
/// `timestamp`, else the last one before it.
fn locate(smoothed: &[SmoothedSample], timestamp: f64) -> Option<usize> {
    if smoothed.is_empty() {
        return None;
    }
    let idx = smoothed.partition_point(|s| s.timestamp < timestamp);
    Some(idx.min(smoothed.len() - 1))
}

/// Stride annotations for every step after the first
pub fn annotate_steps(
    smoothed: &[SmoothedSample],
    steps: &[Step],
    config: &PipelineConfig,
) -> Vec<StepAnnotation> {
    let radius = NEIGHBORHOOD_RADIUS as usize;
    let mut annotations: Vec<StepAnnotation> = Vec::with_capacity(steps.len());

    for pair in steps.windows(2) {
        let (previous, step) = (&pair[0], &pair[1]);
        let interval = step.timestamp - previous.timestamp;
        if interval <= 0.0 {
            continue;
        }
        let Some(idx) = locate(smoothed, step.timestamp) else {
            continue;
        };

        let start = idx.saturating_sub(radius);
        let end = (idx + radius).min(smoothed.len() - 1);
        let neighbourhood: Vec<f64> = smoothed[start..=end].iter().map(|s| s.magnitude).collect();
        let Some(step_length) = kim_step_length(config.kim_coefficient, &neighbourhood) else {
            continue;
        };

        // Current stride plus up to (window - 1) previous ones
        let history = config.anomaly_window.saturating_sub(1);
        let mut window: Vec<f64> = annotations
            .iter()
            .rev()
            .take(history)
            .map(|a| a.step_length)
            .collect();
        window.reverse();
        window.push(step_length);

        let range = if window.len() >= config.anomaly_window {
            RangeStrategy.classify(&window)
        } else {
            None
        };

        annotations.push(StepAnnotation {
            step_number: step.number,
            timestamp: step.timestamp,
            interval,
            step_length,
            velocity: step_length / interval,
            range,
        });
    }

    annotations
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub stride_count: usize,
    pub mean_step_length: f64,
    pub median_step_length: f64,
    pub step_length_range: f64,
    pub mean_velocity: f64,
    pub total_distance: f64,
    pub too_slow: usize,
    pub too_fast: usize,
}

impl SessionSummary {
    pub fn from_annotations(annotations: &[StepAnnotation]) -> Option<Self> {
        let lengths: Vec<f64> = annotations.iter().map(|a| a.step_length).collect();
        let velocities: Vec<f64> = annotations.iter().map(|a| a.velocity).collect();
        let moments = Moments::of(&lengths)?;
        let count_verdict = |v: GaitVerdict| {
            annotations
                .iter()
                .filter(|a| a.verdict() == Some(v))
                .count()
        };

        Some(SessionSummary {
            stride_count: annotations.len(),
            mean_step_length: moments.mean,
            median_step_length: median(&lengths)?,
            step_length_range: moments.range(),
            mean_velocity: mean(&velocities)?,
            total_distance: lengths.iter().sum(),
            too_slow: count_verdict(GaitVerdict::TooSlow),
            too_fast: count_verdict(GaitVerdict::TooFast),
        })
    }
}
