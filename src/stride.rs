use crate::peak_detector::{Peak, SeriesWindow};
use crate::types::StrideMetrics;

/// Raw samples taken on each side of the peak for Kim's estimate
pub const NEIGHBORHOOD_RADIUS: isize = 5;

/// Kim's step length model: `k * cbrt(mean(|a|))`.
///
/// Returns `None` for an empty neighbourhood.
pub fn kim_step_length(coefficient: f64, magnitudes: &[f64]) -> Option<f64> {
    if magnitudes.is_empty() {
        return None;
    }
    let mean_abs = magnitudes.iter().map(|m| m.abs()).sum::<f64>() / magnitudes.len() as f64;
    Some(coefficient * mean_abs.cbrt())
}

/// Converts confirmed peaks into stride length and walking speed
#[derive(Clone, Debug)]
pub struct StrideEstimator {
    kim_coefficient: f64,
}

impl StrideEstimator {
    pub fn new(kim_coefficient: f64) -> Self {
        StrideEstimator { kim_coefficient }
    }

    /// Stride metrics for a confirmed peak.
    ///
    /// The first step of a recording has no previous step and yields `None`;
    /// it only sets the baseline for the next interval.
    pub fn estimate(&self, peak: &Peak, window: &SeriesWindow<'_>) -> Option<StrideMetrics> {
        let previous = peak.previous_step_time?;
        let interval = peak.timestamp - previous;
        if interval <= 0.0 {
            return None;
        }

        // Unsmoothed magnitudes around the canonical peak
        let raw: Vec<f64> = (peak.offset - NEIGHBORHOOD_RADIUS..=peak.offset + NEIGHBORHOOD_RADIUS)
            .filter_map(|o| window.at(o))
            .map(|s| s.magnitude)
            .collect();
        let step_length = kim_step_length(self.kim_coefficient, &raw)?;

        Some(StrideMetrics {
            step_length,
            velocity: step_length / interval,
            interval,
        })
    }
}
