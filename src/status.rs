use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::anomaly::{Classification, GaitVerdict};
use crate::events::{EventSink, PipelineEvent};
use crate::types::Step;

/// Messages kept for the history list
pub const HISTORY_LEN: usize = 20;

/// Live gait alert for whatever drives haptic or audio feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GaitAlert {
    Slow,
    Fast,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub step_count: u64,
    /// Steps with a stride estimate; numbers the live messages
    pub stride_count: u64,
    pub last_step_length: f64,
    pub last_velocity: f64,
    pub alert_message: String,
    pub last_alert: Option<GaitAlert>,
    pub slow_alerts: u64,
    pub fast_alerts: u64,
    pub history: VecDeque<String>,
}

impl LiveStatus {
    pub fn new() -> Self {
        Self {
            timestamp: current_timestamp(),
            step_count: 0,
            stride_count: 0,
            last_step_length: 0.0,
            last_velocity: 0.0,
            alert_message: "Status: Ready".to_string(),
            last_alert: None,
            slow_alerts: 0,
            fast_alerts: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn apply(&mut self, step: &Step) {
        self.timestamp = current_timestamp();
        self.step_count = step.number;

        let message = match step.stride {
            None => "First step detected!".to_string(),
            Some(stride) => {
                self.stride_count += 1;
                self.last_step_length = stride.step_length;
                self.last_velocity = stride.velocity;
                let base = format!(
                    "Step {}: Length = {:.2}m",
                    self.stride_count, stride.step_length
                );
                self.describe(base, &step.classification)
            }
        };

        self.alert_message = message.clone();
        self.history.push_back(message);
        while self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }
    }

    /// Live messages follow the z-score strategy
    fn describe(&mut self, base: String, classification: &Classification) -> String {
        let Some(z) = classification.z_score() else {
            return base;
        };
        match z.verdict {
            GaitVerdict::TooSlow => {
                self.last_alert = Some(GaitAlert::Slow);
                self.slow_alerts += 1;
                format!("{} (ALERT: Walking too slow!)", base)
            }
            GaitVerdict::TooFast => {
                self.last_alert = Some(GaitAlert::Fast);
                self.fast_alerts += 1;
                format!("{} (ALERT: Walking too fast!)", base)
            }
            GaitVerdict::Normal => {
                self.last_alert = None;
                format!("{} (Within normal range)", base)
            }
        }
    }
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Presentation-side consumer of the step stream.
///
/// Clones share one snapshot: register one clone with the session and read
/// from another.
#[derive(Clone, Default)]
pub struct StatusBoard {
    shared: Arc<Mutex<LiveStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> LiveStatus {
        self.shared
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }
}

impl EventSink for StatusBoard {
    fn on_event(&mut self, event: &PipelineEvent) {
        let Ok(mut status) = self.shared.lock() else {
            return;
        };
        match event {
            PipelineEvent::Step(step) => status.apply(step),
            PipelineEvent::Reset => *status = LiveStatus::new(),
            PipelineEvent::Smoothed(_) | PipelineEvent::Classification(_) => {}
        }
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{RangeStrategy, ZScoreStrategy};
    use crate::types::StrideMetrics;

    fn stride_step(number: u64, length: f64, window: &[f64]) -> Step {
        let classification = match (
            RangeStrategy.classify(window),
            ZScoreStrategy::default().classify(window),
        ) {
            (Some(range), Some(z_score)) if window.len() >= 8 => {
                Classification::Assessed { range, z_score }
            }
            _ => Classification::InsufficientData {
                collected: window.len(),
                required: 8,
            },
        };
        Step {
            number,
            timestamp: number as f64 * 0.6,
            peak_magnitude: 10.0,
            stride: Some(StrideMetrics {
                step_length: length,
                velocity: length / 0.6,
                interval: 0.6,
            }),
            classification,
        }
    }

    #[test]
    fn test_messages() {
        let mut board = StatusBoard::new();
        let reader = board.clone();

        board.on_event(&PipelineEvent::Step(Step {
            number: 1,
            timestamp: 0.3,
            peak_magnitude: 10.0,
            stride: None,
            classification: Classification::InsufficientData {
                collected: 0,
                required: 8,
            },
        }));
        board.on_event(&PipelineEvent::Step(stride_step(2, 0.55, &[0.55])));

        let status = reader.snapshot();
        assert_eq!(status.step_count, 2);
        assert_eq!(status.stride_count, 1);
        assert_eq!(status.history[0], "First step detected!");
        // Messages count strides, so the step after the first reads "Step 1"
        assert_eq!(status.history[1], "Step 1: Length = 0.55m");
        assert_eq!(status.alert_message, "Step 1: Length = 0.55m");
        assert!(status.last_alert.is_none());
    }

    #[test]
    fn test_fast_alert() {
        let mut board = StatusBoard::new();
        let window = [0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 5.0];
        board.on_event(&PipelineEvent::Step(stride_step(10, 5.0, &window)));

        let status = board.snapshot();
        assert_eq!(status.last_alert, Some(GaitAlert::Fast));
        assert_eq!(status.fast_alerts, 1);
        assert_eq!(
            status.alert_message,
            "Step 1: Length = 5.00m (ALERT: Walking too fast!)"
        );
    }

    #[test]
    fn test_history_is_bounded_and_reset() {
        let mut board = StatusBoard::new();
        for n in 1..=30 {
            board.on_event(&PipelineEvent::Step(stride_step(n, 0.5, &[0.5; 8])));
        }
        let status = board.snapshot();
        assert_eq!(status.history.len(), HISTORY_LEN);
        assert!(status.history[0].starts_with("Step 11:"));
        assert!(status.history[19].ends_with("(Within normal range)"));

        board.on_event(&PipelineEvent::Reset);
        let status = board.snapshot();
        assert!(status.history.is_empty());
        assert_eq!(status.alert_message, "Status: Ready");
    }

    #[test]
    fn test_save_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live_status.json");
        let path = path.to_str().unwrap();

        LiveStatus::new().save(path).unwrap();
        let parsed: LiveStatus = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed.alert_message, "Status: Ready");
    }
}
