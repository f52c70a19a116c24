//! Streaming step detection pipeline.
//!
//! One sample in, everything downstream runs to completion:
//! delay buffer → smoothing → rolling threshold → peak detection →
//! stride metrics → anomaly classification. All state lives in fixed-size
//! containers owned here, and `reset` clears every stage at once.

use crate::anomaly::{Classification, GaitAnomalyDetector};
use crate::config::PipelineConfig;
use crate::delay_buffer::{BufferedSample, DelayBuffer};
use crate::error::Result;
use crate::events::PipelineEvent;
use crate::peak_detector::{CandidateOutcome, PeakDetector, REFINE_RADIUS};
use crate::stride::{StrideEstimator, NEIGHBORHOOD_RADIUS};
use crate::threshold::RollingThreshold;
use crate::types::{Sample, Step, StepClassification};

/// Look-ahead handed to the detector: refinement scan plus the stride neighbourhood past it
const LOOKAHEAD_LIMIT: usize = (REFINE_RADIUS + NEIGHBORHOOD_RADIUS) as usize;

pub struct StepPipeline {
    config: PipelineConfig,
    buffer: DelayBuffer,
    threshold: RollingThreshold,
    detector: PeakDetector,
    strides: StrideEstimator,
    anomalies: GaitAnomalyDetector,
    step_count: u64,
}

impl StepPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(StepPipeline {
            buffer: DelayBuffer::new(
                config.sampling_interval,
                config.future_window_ticks(),
                config.smoothing_factor,
            ),
            threshold: RollingThreshold::new(config.window_size, config.min_step_threshold),
            detector: PeakDetector::new(config.min_step_threshold, config.min_step_interval),
            strides: StrideEstimator::new(config.kim_coefficient),
            anomalies: GaitAnomalyDetector::new(config.anomaly_window, config.z_score_bounds),
            step_count: 0,
            config,
        })
    }

    /// Feed one raw sample. Returns the events it produced, in order.
    ///
    /// A rejected sample (non-finite or non-monotonic) leaves all state untouched.
    pub fn push(&mut self, sample: Sample) -> Result<Vec<PipelineEvent>> {
        let released = self.buffer.push(sample)?;
        Ok(self.process_released(released))
    }

    /// End of recording: release and process everything still held back
    pub fn flush(&mut self) -> Vec<PipelineEvent> {
        let released = self.buffer.flush();
        self.process_released(released)
    }

    /// Clear every stage in one step
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.threshold.reset();
        self.detector.reset();
        self.anomalies.reset();
        self.step_count = 0;
    }

    /// Offline convenience: reset, run the whole series, flush
    pub fn replay<I>(&mut self, samples: I) -> Result<Vec<PipelineEvent>>
    where
        I: IntoIterator<Item = Sample>,
    {
        self.reset();
        let mut events = Vec::new();
        for sample in samples {
            events.extend(self.push(sample)?);
        }
        events.extend(self.flush());
        Ok(events)
    }

    /// Samples held back waiting for look-ahead
    pub fn pending_len(&self) -> usize {
        self.buffer.pending_len()
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    fn process_released(&mut self, released: Vec<BufferedSample>) -> Vec<PipelineEvent> {
        let mut events = Vec::with_capacity(released.len());
        for (i, sample) in released.iter().enumerate() {
            let ahead: Vec<BufferedSample> = released[i + 1..]
                .iter()
                .chain(self.buffer.pending())
                .take(LOOKAHEAD_LIMIT)
                .copied()
                .collect();
            self.process_sample(*sample, &ahead, &mut events);
        }
        events
    }

    fn process_sample(
        &mut self,
        sample: BufferedSample,
        ahead: &[BufferedSample],
        events: &mut Vec<PipelineEvent>,
    ) {
        events.push(PipelineEvent::Smoothed(sample.smoothed_sample()));

        self.threshold.push(sample.smoothed);
        let threshold = self.threshold.threshold();

        let peak = match self.detector.observe(sample, ahead, threshold) {
            CandidateOutcome::Confirmed(peak) => peak,
            _ => return,
        };

        let stride = self.strides.estimate(&peak, &self.detector.window(ahead));
        let classification = match stride {
            Some(s) => self.anomalies.observe(s.step_length),
            None => Classification::InsufficientData {
                collected: 0,
                required: self.config.anomaly_window,
            },
        };

        self.step_count += 1;
        let step = Step {
            number: self.step_count,
            timestamp: peak.timestamp,
            peak_magnitude: peak.magnitude,
            stride,
            classification,
        };
        events.push(PipelineEvent::Step(step));

        if let Some(s) = stride {
            events.push(PipelineEvent::Classification(StepClassification {
                step_number: self.step_count,
                timestamp: peak.timestamp,
                step_length: s.step_length,
                classification,
            }));
        }
    }
}
