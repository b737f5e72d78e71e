use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::app::ports::{PipelineEvent, PipelineEventSink, PipelineStage};
use crate::config::ProcessingConfig;
use crate::constants::UNKNOWN_CATEGORY;
use crate::infra::tracing_sink::TracingEventSink;
use crate::observability::metrics;
use crate::pipeline::processing::dedupe::RecordDeduplicator;
use crate::pipeline::processing::normalize::RecordCleaner;
use crate::pipeline::processing::quality_gate::{QualityStats, RecordValidator};
use crate::types::Record;

/// Record counts at each stage boundary of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StageCounts {
    pub input: usize,
    pub duplicates_removed: usize,
    pub rejected: usize,
    pub below_threshold: usize,
    pub output: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// The run finished cleanly but no record survived validation and filtering
    NoSurvivors,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::NoSurvivors => "no_survivors",
        }
    }
}

/// Summary of a processed batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub unique_entities: usize,
    pub quality_stats: QualityStats,
    pub category_breakdown: BTreeMap<String, usize>,
    pub validation_status_breakdown: BTreeMap<String, usize>,
}

impl fmt::Display for ProcessingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |count: usize| {
            if self.total == 0 {
                0.0
            } else {
                count as f64 / self.total as f64 * 100.0
            }
        };
        let stats = &self.quality_stats;

        writeln!(f, "Job Leads Processing Summary")?;
        writeln!(f, "============================")?;
        writeln!(f, "Run: {}", self.run_id)?;
        writeln!(f, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        writeln!(f)?;
        writeln!(f, "Total records: {}", self.total)?;
        writeln!(f, "Unique companies: {}", self.unique_entities)?;
        writeln!(f)?;
        writeln!(f, "Data quality:")?;
        writeln!(f, "  Average score: {:.2}", stats.average_score)?;
        writeln!(f, "  High (>= 0.8): {} ({:.1}%)", stats.high_quality, stats.high_quality_pct)?;
        writeln!(f, "  Medium (0.5-0.8): {} ({:.1}%)", stats.medium_quality, stats.medium_quality_pct)?;
        writeln!(f, "  Low (< 0.5): {} ({:.1}%)", stats.low_quality, stats.low_quality_pct)?;
        writeln!(f)?;
        writeln!(f, "Role categories:")?;
        for (category, count) in &self.category_breakdown {
            writeln!(f, "  {}: {} ({:.1}%)", category, count, pct(*count))?;
        }
        Ok(())
    }
}

/// Everything a run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub records: Vec<Record>,
    pub report: ProcessingReport,
    pub counts: StageCounts,
    pub status: RunStatus,
}

/// Runs clean, dedupe, validate and the quality floor over one batch.
///
/// Per-record failures never abort the batch; they are reported to the event sink and
/// aggregated in [`StageCounts`].
pub struct PipelineOrchestrator {
    config: ProcessingConfig,
    sink: Arc<dyn PipelineEventSink>,
    cleaner: RecordCleaner,
    deduplicator: RecordDeduplicator,
    validator: RecordValidator,
}

impl PipelineOrchestrator {
    pub fn new(config: ProcessingConfig, sink: Arc<dyn PipelineEventSink>) -> Self {
        Self {
            config,
            sink,
            cleaner: RecordCleaner::new(),
            deduplicator: RecordDeduplicator::new(),
            validator: RecordValidator::new(),
        }
    }

    /// Orchestrator reporting through structured logs and metrics
    pub fn with_tracing(config: ProcessingConfig) -> Self {
        Self::new(config, Arc::new(TracingEventSink))
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn process(&self, records: Vec<Record>) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);
        let _entered = span.enter();

        let mut counts = StageCounts {
            input: records.len(),
            ..StageCounts::default()
        };
        self.sink.emit(PipelineEvent::RunStarted {
            run_id: run_id.to_string(),
            input: counts.input,
        });

        let cleaned = self.cleaner.clean_all(records);
        self.stage_completed(PipelineStage::Clean, counts.input, cleaned.len());

        let deduped = if self.config.deduplicate {
            let before = cleaned.len();
            let outcome = self.deduplicator.dedupe(cleaned);
            counts.duplicates_removed = outcome.dropped.len();
            for decision in outcome.dropped {
                self.sink.emit(PipelineEvent::DuplicateDropped {
                    key: decision.key.to_string(),
                    kept_id: decision.kept_id,
                    dropped_id: decision.dropped_id,
                });
            }
            self.stage_completed(PipelineStage::Dedupe, before, outcome.records.len());
            outcome.records
        } else {
            self.sink.emit(PipelineEvent::StageSkipped {
                stage: PipelineStage::Dedupe,
            });
            cleaned
        };

        let before = deduped.len();
        let validation = self.validator.validate_all(deduped);
        counts.rejected = validation.rejected.len();
        for rejected in validation.rejected {
            self.sink.emit(PipelineEvent::RecordRejected {
                id: rejected.record.id,
                reason: rejected.reason,
            });
        }
        for advisory in validation.location_advisories {
            self.sink.emit(PipelineEvent::LocationAdvisory {
                id: advisory.id,
                location: advisory.location,
            });
        }
        self.stage_completed(PipelineStage::Validate, before, validation.accepted.len());

        let survivors = self.apply_quality_floor(validation.accepted, &mut counts);
        for record in &survivors {
            if let Some(score) = record.quality_score {
                metrics::pipeline::quality_score_recorded(score);
            }
        }

        let mut report = self.generate_report(&survivors);
        report.run_id = run_id;

        counts.output = survivors.len();
        let status = if survivors.is_empty() {
            RunStatus::NoSurvivors
        } else {
            RunStatus::Completed
        };
        metrics::pipeline::run_finished(status.as_str());
        self.sink.emit(PipelineEvent::RunFinished {
            run_id: run_id.to_string(),
            output: counts.output,
        });

        PipelineRun {
            records: survivors,
            report,
            counts,
            status,
        }
    }

    /// Build the report for an already-processed record set
    pub fn generate_report(&self, records: &[Record]) -> ProcessingReport {
        let unique_entities = records
            .iter()
            .filter_map(|r| r.company_name.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let mut category_breakdown = BTreeMap::new();
        let mut validation_status_breakdown = BTreeMap::new();
        for record in records {
            let category = record.category.as_str().unwrap_or(UNKNOWN_CATEGORY);
            *category_breakdown.entry(category.to_string()).or_insert(0) += 1;
            *validation_status_breakdown
                .entry(record.validation_status.to_string())
                .or_insert(0) += 1;
        }

        ProcessingReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            total: records.len(),
            unique_entities,
            quality_stats: self.validator.get_quality_stats(records),
            category_breakdown,
            validation_status_breakdown,
        }
    }

    fn apply_quality_floor(&self, records: Vec<Record>, counts: &mut StageCounts) -> Vec<Record> {
        let floor = self.config.min_quality_score;
        if floor <= 0.0 {
            self.sink.emit(PipelineEvent::StageSkipped {
                stage: PipelineStage::QualityFloor,
            });
            return records;
        }

        let before = records.len();
        let (kept, dropped): (Vec<Record>, Vec<Record>) = records
            .into_iter()
            .partition(|r| r.quality_score.unwrap_or_default() >= floor);

        counts.below_threshold = dropped.len();
        for record in dropped {
            self.sink.emit(PipelineEvent::BelowQualityFloor {
                score: record.quality_score.unwrap_or_default(),
                id: record.id,
                floor,
            });
        }
        info!("Filtered {} records below quality score {}", counts.below_threshold, floor);
        self.stage_completed(PipelineStage::QualityFloor, before, kept.len());
        kept
    }

    fn stage_completed(&self, stage: PipelineStage, input: usize, output: usize) {
        self.sink.emit(PipelineEvent::StageCompleted { stage, input, output });
    }
}
