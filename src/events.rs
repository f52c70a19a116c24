use crossbeam::channel::{Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::types::{SmoothedSample, Step, StepClassification};

/// Output of the pipeline, delivered in emission order
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// One point of the smoothed series (charting)
    Smoothed(SmoothedSample),
    /// Confirmed step (counters, export, charting)
    Step(Step),
    /// Anomaly verdict for a step that has a stride length (alerting, history)
    Classification(StepClassification),
    /// All pipeline state was cleared
    Reset,
}

/// Consumer of pipeline events.
///
/// Called synchronously from inside the pipeline call; must not block.
pub trait EventSink {
    fn on_event(&mut self, event: &PipelineEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&PipelineEvent),
{
    fn on_event(&mut self, event: &PipelineEvent) {
        self(event)
    }
}

/// Keeps the full smoothed and step series of one recording
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub smoothed: Vec<SmoothedSample>,
    pub steps: Vec<Step>,
    pub classifications: Vec<StepClassification>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.smoothed.clear();
        self.steps.clear();
        self.classifications.clear();
    }
}

impl EventSink for EventLog {
    fn on_event(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Smoothed(s) => self.smoothed.push(*s),
            PipelineEvent::Step(step) => self.steps.push(step.clone()),
            PipelineEvent::Classification(c) => self.classifications.push(c.clone()),
            PipelineEvent::Reset => self.clear(),
        }
    }
}

/// Forwards events to another thread over a bounded channel.
/// A full channel drops the event rather than stalling ingestion.
pub struct ChannelSink {
    tx: Sender<PipelineEvent>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(tx: Sender<PipelineEvent>) -> Self {
        ChannelSink { tx, dropped: 0 }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl EventSink for ChannelSink {
    fn on_event(&mut self, event: &PipelineEvent) {
        match self.tx.try_send(event.clone()) {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped % 100 == 1 {
                    log::warn!("Event channel full, {} events dropped", self.dropped);
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                // Receiver gone; nothing left to deliver to
                self.dropped += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;

    fn smoothed(t: f64) -> PipelineEvent {
        PipelineEvent::Smoothed(SmoothedSample {
            timestamp: t,
            magnitude: 9.8,
        })
    }

    #[test]
    fn test_closure_sink() {
        let mut count = 0;
        {
            let mut sink = |_: &PipelineEvent| count += 1;
            sink.on_event(&smoothed(0.0));
            sink.on_event(&smoothed(0.1));
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_event_log_reset() {
        let mut log = EventLog::new();
        log.on_event(&smoothed(0.0));
        assert_eq!(log.smoothed.len(), 1);
        log.on_event(&PipelineEvent::Reset);
        assert!(log.smoothed.is_empty());
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (tx, rx) = bounded(2);
        let mut sink = ChannelSink::new(tx);
        for i in 0..5 {
            sink.on_event(&smoothed(i as f64 * 0.1));
        }
        assert_eq!(sink.dropped(), 3);
        assert_eq!(rx.try_iter().count(), 2);
    }
}
