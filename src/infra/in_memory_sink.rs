use std::sync::{Arc, Mutex, PoisonError};

use crate::app::ports::{PipelineEvent, PipelineEventSink, PipelineStage};

/// Sink that keeps every event in memory, for assertions and embedding callers
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn rejected_count(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::RecordRejected { .. }))
    }

    pub fn duplicate_count(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::DuplicateDropped { .. }))
    }

    pub fn below_floor_count(&self) -> usize {
        self.count(|e| matches!(e, PipelineEvent::BelowQualityFloor { .. }))
    }

    /// `(input, output)` of a completed stage, if it ran
    pub fn stage_delta(&self, stage: PipelineStage) -> Option<(usize, usize)> {
        self.events().into_iter().find_map(|e| match e {
            PipelineEvent::StageCompleted { stage: s, input, output } if s == stage => {
                Some((input, output))
            }
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| predicate(e))
            .count()
    }
}

impl PipelineEventSink for InMemoryEventSink {
    fn emit(&self, event: PipelineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
