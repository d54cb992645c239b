use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initializing,
    Preprocessing,
    Recognizing,
    Done,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Initializing => "Initializing OCR...",
            Stage::Preprocessing => "Preprocessing image...",
            Stage::Recognizing => "Recognizing text...",
            Stage::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub percent: u8,
}

impl ProgressEvent {
    pub fn new(stage: Stage, percent: u8) -> Self {
        Self {
            stage,
            percent: percent.min(100),
        }
    }
}

/// Emits progress for one invocation, enforcing ordering.
///
/// Stages only move forward and percent never decreases within a stage;
/// events that would violate either, or repeat the last one, are dropped. A closed receiver is
/// ignored so an abandoned caller never fails the recognition task.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: Option<UnboundedSender<ProgressEvent>>,
    last: Option<ProgressEvent>,
}

impl ProgressReporter {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx: Some(tx),
            last: None,
        }
    }

    /// A reporter that only tracks state.
    pub fn silent() -> Self {
        Self { tx: None, last: None }
    }

    pub fn report(&mut self, stage: Stage, percent: u8) {
        let event = ProgressEvent::new(stage, percent);
        if let Some(last) = self.last {
            if event.stage < last.stage
                || (event.stage == last.stage && event.percent <= last.percent)
            {
                return;
            }
        }
        self.last = Some(event);
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn last(&self) -> Option<ProgressEvent> {
        self.last
    }
}
