//! Metrics for the fetch scheduler and the record quality pipeline.
//!
//! Everything records through the `metrics` facade; without an installed recorder the
//! calls are no-ops, so library users and tests pay nothing.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{Result, ScraperError};

/// All metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Rate limiter
    RateLimiterGrants,
    RateLimiterWaitSeconds,

    // Fetch retry policy
    FetchAttempts,
    FetchOutcomes,
    IdentityRotations,

    // Pipeline stages
    PipelineRecordsReceived,
    PipelineDuplicatesRemoved,
    PipelineRecordsRejected,
    PipelineRecordsFiltered,
    PipelineRecordsEmitted,
    PipelineQualityScore,
    PipelineRuns,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RateLimiterGrants => "leads_rate_limiter_grants_total",
            MetricName::RateLimiterWaitSeconds => "leads_rate_limiter_wait_seconds",
            MetricName::FetchAttempts => "leads_fetch_attempts_total",
            MetricName::FetchOutcomes => "leads_fetch_outcomes_total",
            MetricName::IdentityRotations => "leads_identity_rotations_total",
            MetricName::PipelineRecordsReceived => "leads_pipeline_records_received_total",
            MetricName::PipelineDuplicatesRemoved => "leads_pipeline_duplicates_removed_total",
            MetricName::PipelineRecordsRejected => "leads_pipeline_records_rejected_total",
            MetricName::PipelineRecordsFiltered => "leads_pipeline_records_filtered_total",
            MetricName::PipelineRecordsEmitted => "leads_pipeline_records_emitted_total",
            MetricName::PipelineQualityScore => "leads_pipeline_quality_score",
            MetricName::PipelineRuns => "leads_pipeline_runs_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder as the global metrics recorder
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ScraperError::Metrics(format!("Failed to install Prometheus recorder: {}", e)))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Render the current metrics in Prometheus exposition format
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Rate limiter
// ============================================================================

pub mod rate_limiter {
    use super::MetricName;

    /// Record one granted admission and how long the caller waited for it
    pub fn grant(wait_secs: f64) {
        ::metrics::counter!(MetricName::RateLimiterGrants.as_str()).increment(1);
        ::metrics::histogram!(MetricName::RateLimiterWaitSeconds.as_str()).record(wait_secs);
    }
}

// ============================================================================
// Fetch retry policy
// ============================================================================

pub mod fetch {
    use super::MetricName;

    pub fn attempt(kind: &'static str) {
        ::metrics::counter!(MetricName::FetchAttempts.as_str(), "kind" => kind).increment(1);
    }

    pub fn outcome(outcome: &'static str) {
        ::metrics::counter!(MetricName::FetchOutcomes.as_str(), "outcome" => outcome).increment(1);
    }

    pub fn identity_rotated() {
        ::metrics::counter!(MetricName::IdentityRotations.as_str()).increment(1);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub mod pipeline {
    use super::MetricName;

    pub fn records_received(count: usize) {
        ::metrics::counter!(MetricName::PipelineRecordsReceived.as_str()).increment(count as u64);
    }

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::PipelineDuplicatesRemoved.as_str()).increment(count as u64);
    }

    pub fn record_rejected(reason: &'static str) {
        ::metrics::counter!(MetricName::PipelineRecordsRejected.as_str(), "reason" => reason)
            .increment(1);
    }

    pub fn records_filtered(count: usize) {
        ::metrics::counter!(MetricName::PipelineRecordsFiltered.as_str()).increment(count as u64);
    }

    pub fn records_emitted(count: usize) {
        ::metrics::counter!(MetricName::PipelineRecordsEmitted.as_str()).increment(count as u64);
    }

    pub fn quality_score_recorded(score: f64) {
        ::metrics::histogram!(MetricName::PipelineQualityScore.as_str()).record(score);
    }

    pub fn run_finished(status: &'static str) {
        ::metrics::counter!(MetricName::PipelineRuns.as_str(), "status" => status).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names = [
            MetricName::RateLimiterGrants,
            MetricName::RateLimiterWaitSeconds,
            MetricName::FetchAttempts,
            MetricName::FetchOutcomes,
            MetricName::IdentityRotations,
            MetricName::PipelineRecordsReceived,
            MetricName::PipelineDuplicatesRemoved,
            MetricName::PipelineRecordsRejected,
            MetricName::PipelineRecordsFiltered,
            MetricName::PipelineRecordsEmitted,
            MetricName::PipelineQualityScore,
            MetricName::PipelineRuns,
        ];
        let unique: HashSet<_> = names.iter().map(|n| n.as_str()).collect();
        assert_eq!(unique.len(), names.len());
        assert!(names.iter().all(|n| n.to_string().starts_with("leads_")));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        pipeline::records_received(3);
        rate_limiter::grant(0.5);
        fetch::attempt("status");
    }
}
