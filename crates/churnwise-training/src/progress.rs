use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    Training,
    Evaluation,
    Publishing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ingestion => "data ingestion",
            Self::Validation => "data validation",
            Self::Transformation => "data transformation",
            Self::Training => "model training",
            Self::Evaluation => "model evaluation",
            Self::Publishing => "model publishing",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { run_id: String, stage: Stage },
    Finished { run_id: String, stage: Stage },
    Skipped { run_id: String, stage: Stage, reason: String },
    Message { run_id: String, message: String },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { run_id, stage } => tracing::info!(%run_id, %stage, "stage started"),
            ProgressEvent::Finished { run_id, stage } => tracing::info!(%run_id, %stage, "stage finished"),
            ProgressEvent::Skipped { run_id, stage, reason } => {
                tracing::info!(%run_id, %stage, %reason, "stage skipped");
            }
            ProgressEvent::Message { run_id, message } => tracing::info!(%run_id, "{message}"),
        }
    }
}

/// Keeps every event in memory; used by tests and callers that report at the end.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgressSink {
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingProgressSink::default();
        sink.on_event(ProgressEvent::Started { run_id: "r".into(), stage: Stage::Ingestion });
        sink.on_event(ProgressEvent::Finished { run_id: "r".into(), stage: Stage::Ingestion });
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], ProgressEvent::Finished { stage: Stage::Ingestion, .. }));
    }

    #[test]
    fn test_event_json_shape() {
        let event = ProgressEvent::Skipped {
            run_id: "r".into(),
            stage: Stage::Publishing,
            reason: "not accepted".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "skipped");
        assert_eq!(json["stage"], "publishing");
    }
}
