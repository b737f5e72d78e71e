use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::pipeline::processing::quality_gate::RejectionReason;

// Ingest-side ports

/// Result of one raw fetch attempt, before any retry policy is applied
#[derive(Clone, Debug, PartialEq)]
pub enum FetchAttempt {
    /// HTTP 200 with its body
    Payload(String),
    /// Any non-200 status code
    Status(u16),
    Timeout,
    Transport(String),
}

#[async_trait]
pub trait FetchPort: Send + Sync {
    /// Perform one attempt, presenting `identity` (a client signature) to the remote service
    async fn fetch(&self, url: &str, identity: &str) -> FetchAttempt;
}

#[async_trait]
pub trait RateLimiterPort: Send + Sync {
    /// Block until an outbound request may proceed; returns the time spent waiting
    async fn acquire(&self) -> Duration;
}

// Processing-side ports

/// Pipeline stages as they appear in emitted events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Clean,
    Dedupe,
    Validate,
    QualityFloor,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Clean => "clean",
            PipelineStage::Dedupe => "dedupe",
            PipelineStage::Validate => "validate",
            PipelineStage::QualityFloor => "quality_floor",
        }
    }
}

/// Structured events emitted by the orchestrator
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    RunStarted { run_id: String, input: usize },
    StageCompleted { stage: PipelineStage, input: usize, output: usize },
    StageSkipped { stage: PipelineStage },
    DuplicateDropped { key: String, kept_id: String, dropped_id: String },
    RecordRejected { id: String, reason: RejectionReason },
    LocationAdvisory { id: String, location: String },
    BelowQualityFloor { id: String, score: f64, floor: f64 },
    RunFinished { run_id: String, output: usize },
}

pub trait PipelineEventSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}
