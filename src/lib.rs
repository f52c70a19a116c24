//! Streaming step detection and gait monitoring from raw accelerometer samples.
//!
//! Samples flow through a fixed chain of stages:
//!
//! 1. [`delay_buffer`] snaps samples to a 0.1 s grid, drops duplicates, smooths
//!    the magnitude and holds entries back for one second of look-ahead
//! 2. [`threshold`] keeps the adaptive detection threshold
//! 3. [`peak_detector`] confirms steps from local maxima of the smoothed series
//! 4. [`stride`] estimates step length (Kim's model) and walking speed
//! 5. [`anomaly`] classifies each stride against the recent ones
//!
//! [`pipeline::StepPipeline`] wires the stages together and emits
//! [`events::PipelineEvent`]s; [`session::Session`] adds the recording state
//! machine and fans events out to sinks.

pub mod analysis;
pub mod anomaly;
pub mod config;
pub mod delay_buffer;
pub mod error;
pub mod events;
pub mod peak_detector;
pub mod pipeline;
pub mod recording;
pub mod session;
pub mod smoothing;
pub mod status;
pub mod stride;
pub mod threshold;
pub mod types;

pub use config::PipelineConfig;
pub use error::{Result, StepTrackerError};
pub use events::{EventSink, PipelineEvent};
pub use pipeline::StepPipeline;
pub use session::{Session, SessionState};
pub use types::{Sample, SmoothedSample, Step};
