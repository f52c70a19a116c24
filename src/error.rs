use thiserror::Error;

/// Step tracker error types
#[derive(Error, Debug)]
pub enum StepTrackerError {
    #[error("Non-monotonic timestamp: {timestamp} is not after {last}")]
    NonMonotonicTimestamp { timestamp: f64, last: f64 },

    #[error("Invalid sample at {timestamp}: {reason}")]
    InvalidSample { timestamp: f64, reason: String },

    #[error("Session already running")]
    AlreadyRunning,

    #[error("Session not running")]
    NotRunning,

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StepTrackerError {
    /// True for errors that reject a single sample without touching pipeline state
    pub fn is_sample_rejection(&self) -> bool {
        matches!(
            self,
            StepTrackerError::NonMonotonicTimestamp { .. } | StepTrackerError::InvalidSample { .. }
        )
    }
}

/// Result type for step tracker operations
pub type Result<T> = std::result::Result<T, StepTrackerError>;
