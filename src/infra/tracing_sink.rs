use tracing::{debug, info, warn};

use crate::app::ports::{PipelineEvent, PipelineEventSink};
use crate::observability::metrics;

/// Default sink: structured log lines plus pipeline metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl PipelineEventSink for TracingEventSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { run_id, input } => {
                info!(%run_id, input, "Starting data processing pipeline");
                metrics::pipeline::records_received(input);
            }
            PipelineEvent::StageCompleted { stage, input, output } => {
                let removed = input.saturating_sub(output);
                info!(stage = stage.as_str(), input, output, removed, "Stage complete");
            }
            PipelineEvent::StageSkipped { stage } => {
                info!(stage = stage.as_str(), "Stage skipped (disabled in config)");
            }
            PipelineEvent::DuplicateDropped { key, kept_id, dropped_id } => {
                debug!(%key, %kept_id, %dropped_id, "Dropped duplicate");
                metrics::pipeline::duplicates_removed(1);
            }
            PipelineEvent::RecordRejected { id, reason } => {
                warn!(%id, %reason, "Invalid record skipped");
                metrics::pipeline::record_rejected(reason.label());
            }
            PipelineEvent::LocationAdvisory { id, location } => {
                debug!(%id, %location, "Location does not look like a US location");
            }
            PipelineEvent::BelowQualityFloor { id, score, floor } => {
                debug!(%id, score, floor, "Record below quality threshold");
                metrics::pipeline::records_filtered(1);
            }
            PipelineEvent::RunFinished { run_id, output } => {
                info!(%run_id, output, "Processing complete");
                metrics::pipeline::records_emitted(output);
            }
        }
    }
}
