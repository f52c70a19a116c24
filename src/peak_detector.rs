//! Peak confirmation and step segmentation over the released smoothed series.
//!
//! Each released sample is a potential candidate. A candidate must clear
//! both the adaptive threshold and the absolute floor, beat its two
//! neighbours on each side, and may then be superseded by a higher value up
//! to five samples ahead. The surviving peak is only accepted if it is at
//! least `min_step_interval` after the previous confirmed step; otherwise it
//! is discarded outright.

use std::collections::VecDeque;

use crate::delay_buffer::BufferedSample;

/// Samples compared on each side for local-maximum confirmation
pub const NEIGHBOR_RADIUS: isize = 2;
/// Total look-ahead scanned for a later, higher maximum
pub const REFINE_RADIUS: isize = NEIGHBOR_RADIUS + 3;
/// History kept behind the current sample (covers the stride neighbourhood)
const HISTORY_CAPACITY: usize = 8;
/// Grid rounding slack when comparing step spacing
const TIME_EPSILON: f64 = 1e-9;

/// View over the series around the sample being evaluated.
/// Offset 0 is the current sample, negatives are history, positives look-ahead.
pub struct SeriesWindow<'a> {
    behind: &'a VecDeque<BufferedSample>,
    ahead: &'a [BufferedSample],
}

impl<'a> SeriesWindow<'a> {
    pub fn new(behind: &'a VecDeque<BufferedSample>, ahead: &'a [BufferedSample]) -> Self {
        SeriesWindow { behind, ahead }
    }

    pub fn at(&self, offset: isize) -> Option<&'a BufferedSample> {
        if offset <= 0 {
            let idx = self.behind.len() as isize - 1 + offset;
            if idx < 0 {
                return None;
            }
            self.behind.get(idx as usize)
        } else {
            self.ahead.get(offset as usize - 1)
        }
    }
}

/// Canonical peak of a confirmed step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Position relative to the sample that triggered the candidate (0..=5)
    pub offset: isize,
    pub timestamp: f64,
    pub magnitude: f64,
    /// Timestamp of the step confirmed before this one
    pub previous_step_time: Option<f64>,
}

/// What happened to the sample just observed
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CandidateOutcome {
    /// Fewer than two earlier samples in the series
    Warmup,
    BelowThreshold,
    NotLocalMax,
    /// Peak confirmed but too close to the previous step; discarded
    TooSoon(Peak),
    Confirmed(Peak),
}

pub struct PeakDetector {
    min_step_threshold: f64,
    min_step_interval: f64,
    history: VecDeque<BufferedSample>,
    observed: u64,
    last_step_time: Option<f64>,
}

impl PeakDetector {
    pub fn new(min_step_threshold: f64, min_step_interval: f64) -> Self {
        PeakDetector {
            min_step_threshold,
            min_step_interval,
            history: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
            observed: 0,
            last_step_time: None,
        }
    }

    /// Evaluate the next released sample.
    ///
    /// `ahead` holds the samples that follow it (later entries of the same
    /// release plus anything still in the delay buffer). Missing look-ahead
    /// is skipped, never counted as a failed comparison.
    pub fn observe(
        &mut self,
        sample: BufferedSample,
        ahead: &[BufferedSample],
        threshold: f64,
    ) -> CandidateOutcome {
        self.history.push_back(sample);
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
        let index = self.observed;
        self.observed += 1;

        if index < 2 {
            return CandidateOutcome::Warmup;
        }

        let value = sample.smoothed;
        if !(value > threshold && value > self.min_step_threshold) {
            return CandidateOutcome::BelowThreshold;
        }

        let window = SeriesWindow::new(&self.history, ahead);
        let beats_neighbors = (-NEIGHBOR_RADIUS..=NEIGHBOR_RADIUS)
            .filter(|&o| o != 0)
            .filter_map(|o| window.at(o))
            .all(|n| value > n.smoothed);
        if !beats_neighbors {
            return CandidateOutcome::NotLocalMax;
        }

        // Later, strictly higher maximum supersedes the candidate
        let mut best = (0isize, sample);
        for offset in 1..=REFINE_RADIUS {
            if let Some(next) = window.at(offset) {
                if next.smoothed > best.1.smoothed {
                    best = (offset, *next);
                }
            }
        }
        let (offset, canonical) = best;

        let peak = Peak {
            offset,
            timestamp: canonical.timestamp,
            magnitude: canonical.smoothed,
            previous_step_time: self.last_step_time,
        };

        if let Some(last) = self.last_step_time {
            if peak.timestamp - last + TIME_EPSILON < self.min_step_interval {
                log::debug!(
                    "Discarding peak at {:.2}s ({:.3}): {:.2}s after previous step",
                    peak.timestamp,
                    peak.magnitude,
                    peak.timestamp - last
                );
                return CandidateOutcome::TooSoon(peak);
            }
        }

        self.last_step_time = Some(peak.timestamp);
        log::debug!(
            "Step detected at time: {:.2}s, accel: {:.3}, threshold: {:.3}",
            peak.timestamp,
            peak.magnitude,
            threshold
        );
        CandidateOutcome::Confirmed(peak)
    }

    /// Series view around the most recently observed sample
    pub fn window<'a>(&'a self, ahead: &'a [BufferedSample]) -> SeriesWindow<'a> {
        SeriesWindow::new(&self.history, ahead)
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.observed = 0;
        self.last_step_time = None;
    }
}
