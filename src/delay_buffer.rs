//! Look-ahead buffer in front of the detector.
//!
//! Samples are snapped to a fixed time grid (first sample per interval
//! wins), their magnitude is smoothed immediately, and the entry is held
//! until `future_window` worth of newer grid points has arrived. Release
//! works on integer ticks so the predicate never drifts with float error.

use std::collections::VecDeque;

use crate::error::{Result, StepTrackerError};
use crate::smoothing::ExponentialSmoother;
use crate::types::{Sample, SmoothedSample};

/// Upper bound on up-front allocation; longer windows grow on demand
const PREALLOC_LIMIT: usize = 64;

/// A grid-aligned sample waiting for (or released after) its look-ahead
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BufferedSample {
    /// Grid index since the first accepted sample
    pub tick: u64,
    /// `tick * sampling_interval`
    pub timestamp: f64,
    /// Instantaneous magnitude (unsmoothed)
    pub magnitude: f64,
    pub smoothed: f64,
}

impl BufferedSample {
    pub fn smoothed_sample(&self) -> SmoothedSample {
        SmoothedSample {
            timestamp: self.timestamp,
            magnitude: self.smoothed,
        }
    }
}

pub struct DelayBuffer {
    sampling_interval: f64,
    window_ticks: u64,
    smoother: ExponentialSmoother,
    origin: Option<f64>,
    last_timestamp: Option<f64>,
    last_tick: Option<u64>,
    pending: VecDeque<BufferedSample>,
}

impl DelayBuffer {
    pub fn new(sampling_interval: f64, window_ticks: u64, smoothing_factor: f64) -> Self {
        DelayBuffer {
            sampling_interval,
            window_ticks,
            smoother: ExponentialSmoother::new(smoothing_factor),
            origin: None,
            last_timestamp: None,
            last_tick: None,
            pending: VecDeque::with_capacity((window_ticks as usize).min(PREALLOC_LIMIT)),
        }
    }

    /// Accept one raw sample and return whatever is now ready, oldest first.
    ///
    /// Invalid or non-monotonic samples are rejected before any state changes.
    pub fn push(&mut self, sample: Sample) -> Result<Vec<BufferedSample>> {
        sample.validate()?;
        if let Some(last) = self.last_timestamp {
            if sample.timestamp <= last {
                return Err(StepTrackerError::NonMonotonicTimestamp {
                    timestamp: sample.timestamp,
                    last,
                });
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        let origin = *self.origin.get_or_insert(sample.timestamp);
        let tick = ((sample.timestamp - origin) / self.sampling_interval).round() as u64;
        if self.last_tick == Some(tick) {
            log::trace!("Dropping duplicate sample at {:.3}s (tick {})", sample.timestamp, tick);
            return Ok(Vec::new());
        }
        self.last_tick = Some(tick);

        let magnitude = sample.magnitude();
        let smoothed = self.smoother.apply(magnitude);
        self.pending.push_back(BufferedSample {
            tick,
            timestamp: tick as f64 * self.sampling_interval,
            magnitude,
            smoothed,
        });

        Ok(self.release())
    }

    /// Release every entry that has a full look-ahead behind it
    fn release(&mut self) -> Vec<BufferedSample> {
        let Some(newest) = self.pending.back().map(|s| s.tick) else {
            return Vec::new();
        };
        let Some(cutoff) = newest.checked_sub(self.window_ticks) else {
            return Vec::new();
        };

        let mut ready = Vec::new();
        while let Some(front) = self.pending.front() {
            if front.tick > cutoff {
                break;
            }
            if let Some(entry) = self.pending.pop_front() {
                ready.push(entry);
            }
        }
        ready
    }

    /// End of recording: release everything regardless of look-ahead
    pub fn flush(&mut self) -> Vec<BufferedSample> {
        self.pending.drain(..).collect()
    }

    /// Entries still held back, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &BufferedSample> + '_ {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
        self.origin = None;
        self.last_timestamp = None;
        self.last_tick = None;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn still(t: f64) -> Sample {
        Sample::new(t, 0.0, 0.0, 9.8)
    }

    #[test]
    fn test_huge_window_holds_everything() {
        let mut buffer = DelayBuffer::new(0.1, u64::MAX, 0.1);
        for i in 0..100 {
            assert!(buffer.push(still(i as f64 * 0.1)).unwrap().is_empty());
        }
        assert_eq!(buffer.flush().len(), 100);
    }

    #[test]
    fn test_holds_until_future_window() {
        let mut buffer = DelayBuffer::new(0.1, 10, 0.1);
        for i in 0..10 {
            let released = buffer.push(still(100.0 + i as f64 * 0.1)).unwrap();
            assert!(released.is_empty(), "released early at i={}", i);
        }
        assert_eq!(buffer.pending_len(), 10);

        // tick 10 arrives -> tick 0 has a full second of look-ahead
        let released = buffer.push(still(101.0)).unwrap();
        assert_eq!(released.len(), 1);
        assert_eq!(released[0].tick, 0);
        assert_eq!(released[0].timestamp, 0.0);
    }

    #[test]
    fn test_duplicates_within_interval_are_dropped() {
        let mut buffer = DelayBuffer::new(0.1, 10, 0.1);
        buffer.push(Sample::new(0.00, 0.0, 0.0, 9.0)).unwrap();
        buffer.push(Sample::new(0.02, 0.0, 0.0, 50.0)).unwrap(); // rounds to tick 0
        buffer.push(Sample::new(0.04, 0.0, 0.0, 50.0)).unwrap(); // rounds to tick 0
        buffer.push(Sample::new(0.09, 0.0, 0.0, 10.0)).unwrap(); // tick 1

        let all = buffer.flush();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].magnitude, 9.0);
        assert_eq!(all[1].tick, 1);
        // duplicates never reached the smoother
        assert_relative_eq!(all[1].smoothed, 9.1, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_monotonic_without_state_change() {
        let mut buffer = DelayBuffer::new(0.1, 10, 0.1);
        buffer.push(still(5.0)).unwrap();
        buffer.push(still(5.1)).unwrap();

        let err = buffer.push(still(5.1)).unwrap_err();
        assert!(matches!(err, StepTrackerError::NonMonotonicTimestamp { .. }));
        let err = buffer.push(still(4.0)).unwrap_err();
        assert!(matches!(err, StepTrackerError::NonMonotonicTimestamp { .. }));
        assert_eq!(buffer.pending_len(), 2);

        // Still accepts the next valid sample
        buffer.push(still(5.2)).unwrap();
        assert_eq!(buffer.pending_len(), 3);
    }

    #[test]
    fn test_rejects_invalid_sample() {
        let mut buffer = DelayBuffer::new(0.1, 10, 0.1);
        buffer.push(still(0.0)).unwrap();
        let err = buffer.push(Sample::new(0.1, f64::NAN, 0.0, 9.8)).unwrap_err();
        assert!(matches!(err, StepTrackerError::InvalidSample { .. }));
        assert_eq!(buffer.pending_len(), 1);
    }

    #[test]
    fn test_gap_releases_batch_in_order() {
        let mut buffer = DelayBuffer::new(0.1, 10, 0.1);
        for i in 0..5 {
            buffer.push(still(i as f64 * 0.1)).unwrap();
        }
        // 3 second gap releases everything older than the new cutoff
        let released = buffer.push(still(3.0)).unwrap();
        let ticks: Vec<u64> = released.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2, 3, 4]);
        assert_eq!(buffer.pending_len(), 1);
    }

    #[test]
    fn test_flush_and_reset() {
        let mut buffer = DelayBuffer::new(0.1, 10, 0.1);
        for i in 0..4 {
            buffer.push(still(10.0 + i as f64 * 0.1)).unwrap();
        }
        assert_eq!(buffer.flush().len(), 4);
        assert_eq!(buffer.pending_len(), 0);

        buffer.push(still(20.0)).unwrap();
        buffer.reset();
        assert_eq!(buffer.pending_len(), 0);
        // Earlier timestamps are fine again after reset; origin re-anchors
        let released = buffer.push(still(1.0)).unwrap();
        assert!(released.is_empty());
        assert_eq!(buffer.flush()[0].tick, 0);
    }
}
