use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::config::PipelineConfig;
use crate::error::{Result, StepTrackerError};
use crate::events::{EventSink, PipelineEvent};
use crate::pipeline::StepPipeline;
use crate::types::Sample;

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created but not recording
    Idle,
    /// Feeding samples through the pipeline
    Recording,
    /// Samples ignored, pipeline state kept
    Paused,
}

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: String,
    pub state: SessionState,
    pub samples_received: u64,
    pub samples_rejected: u64,
    pub smoothed_count: u64,
    pub step_count: u64,
    pub stride_count: u64,
    pub distance_meters: f64,
    pub peak_velocity_ms: f64,
}

impl SessionMetadata {
    fn new(state: SessionState) -> Self {
        SessionMetadata {
            session_id: format!("session_{}", Utc::now().timestamp_millis()),
            start_time: Utc::now().to_rfc3339(),
            state,
            samples_received: 0,
            samples_rejected: 0,
            smoothed_count: 0,
            step_count: 0,
            stride_count: 0,
            distance_meters: 0.0,
            peak_velocity_ms: 0.0,
        }
    }

    fn record(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Smoothed(_) => self.smoothed_count += 1,
            PipelineEvent::Step(step) => {
                self.step_count += 1;
                if let Some(stride) = step.stride {
                    self.stride_count += 1;
                    self.distance_meters += stride.step_length;
                    if stride.velocity > self.peak_velocity_ms {
                        self.peak_velocity_ms = stride.velocity;
                    }
                }
            }
            PipelineEvent::Classification(_) | PipelineEvent::Reset => {}
        }
    }
}

struct SessionInner {
    metadata: SessionMetadata,
    pipeline: StepPipeline,
    sinks: Vec<Box<dyn EventSink + Send>>,
}

impl SessionInner {
    fn dispatch(&mut self, events: &[PipelineEvent]) {
        for event in events {
            self.metadata.record(event);
            for sink in self.sinks.iter_mut() {
                sink.on_event(event);
            }
        }
    }

    fn reset(&mut self) {
        self.pipeline.reset();
        let state = self.metadata.state;
        self.metadata = SessionMetadata::new(state);
        self.dispatch(&[PipelineEvent::Reset]);
    }
}

/// Recording session around one pipeline.
///
/// Every operation takes the same lock, so samples from several producers
/// are serialised and `reset` is never observed half done. Sinks run under
/// that lock: they must not block and must not call back into the session.
pub struct Session {
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Create new session in Idle state
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let pipeline = StepPipeline::new(config)?;
        Ok(Session {
            inner: Mutex::new(SessionInner {
                metadata: SessionMetadata::new(SessionState::Idle),
                pipeline,
                sinks: Vec::new(),
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionInner>> {
        self.inner
            .lock()
            .map_err(|_| StepTrackerError::Internal("Failed to acquire session lock".to_string()))
    }

    /// Register a consumer for every event emitted from now on
    pub fn register_sink<S>(&self, sink: S) -> Result<()>
    where
        S: EventSink + Send + 'static,
    {
        self.lock()?.sinks.push(Box::new(sink));
        Ok(())
    }

    /// Idle → Recording starts from a clean pipeline; Paused → Recording resumes
    pub fn start_recording(&self) -> Result<()> {
        let mut inner = self.lock()?;

        match inner.metadata.state {
            SessionState::Idle => {
                inner.reset();
                inner.metadata.state = SessionState::Recording;
                log::info!("Recording started ({})", inner.metadata.session_id);
                Ok(())
            }
            SessionState::Recording => Err(StepTrackerError::AlreadyRunning),
            SessionState::Paused => {
                inner.metadata.state = SessionState::Recording;
                log::info!("Recording resumed ({})", inner.metadata.session_id);
                Ok(())
            }
        }
    }

    /// Recording → Paused
    pub fn pause_recording(&self) -> Result<()> {
        let mut inner = self.lock()?;

        match inner.metadata.state {
            SessionState::Recording => {
                inner.metadata.state = SessionState::Paused;
                log::info!("Recording paused ({})", inner.metadata.session_id);
                Ok(())
            }
            SessionState::Paused => Err(StepTrackerError::InvalidState(
                "Already paused".to_string(),
            )),
            SessionState::Idle => Err(StepTrackerError::InvalidState("Not recording".to_string())),
        }
    }

    /// Recording | Paused → Idle after flushing the look-ahead buffer
    pub fn stop_recording(&self) -> Result<()> {
        let mut inner = self.lock()?;

        match inner.metadata.state {
            SessionState::Recording | SessionState::Paused => {
                let events = inner.pipeline.flush();
                inner.dispatch(&events);
                inner.metadata.state = SessionState::Idle;
                log::info!(
                    "Recording stopped ({}): {} steps, {:.2} m",
                    inner.metadata.session_id,
                    inner.metadata.step_count,
                    inner.metadata.distance_meters
                );
                Ok(())
            }
            SessionState::Idle => Err(StepTrackerError::NotRunning),
        }
    }

    /// Atomically clear all pipeline state and counters; state is kept
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.reset();
        Ok(())
    }

    /// Feed one sample. Ignored unless recording.
    pub fn push_sample(&self, sample: Sample) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.metadata.state != SessionState::Recording {
            return Ok(());
        }

        inner.metadata.samples_received += 1;
        match inner.pipeline.push(sample) {
            Ok(events) => {
                inner.dispatch(&events);
                Ok(())
            }
            Err(e) => {
                inner.metadata.samples_rejected += 1;
                log::warn!("Rejected sample: {}", e);
                Err(e)
            }
        }
    }

    /// Get current state
    pub fn get_state(&self) -> Result<SessionState> {
        Ok(self.lock()?.metadata.state)
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> Result<bool> {
        Ok(self.get_state()? == SessionState::Recording)
    }

    /// Get metadata snapshot
    pub fn get_metadata(&self) -> Result<SessionMetadata> {
        Ok(self.lock()?.metadata.clone())
    }

    /// Samples held back in the look-ahead buffer
    pub fn pending_samples(&self) -> Result<usize> {
        Ok(self.lock()?.pipeline.pending_len())
    }
}
