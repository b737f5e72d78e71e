use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::*;
use crate::types::{Record, ValidationStatus};

/// Inclusive character-count bounds for company names and job titles
pub const MIN_TEXT_LENGTH: usize = 2;
pub const MAX_TEXT_LENGTH: usize = 200;

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+[A-Z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
    )
    .expect("URL pattern is a valid regex")
});

/// Why a record was excluded from the output
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("company name length {0} outside [2, 200]")]
    EntityNameLength(usize),
    #[error("job title length {0} outside [2, 200]")]
    TitleLength(usize),
    #[error("invalid job URL: {0}")]
    InvalidUrl(String),
}

impl RejectionReason {
    /// Stable label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            RejectionReason::MissingField(_) => "missing_field",
            RejectionReason::EntityNameLength(_) => "company_name_length",
            RejectionReason::TitleLength(_) => "title_length",
            RejectionReason::InvalidUrl(_) => "invalid_url",
        }
    }
}

/// A record that failed validation, marked `REJECTED`
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub record: Record,
    pub reason: RejectionReason,
}

/// A surviving record whose location matched none of the known US markers
#[derive(Debug, Clone, PartialEq)]
pub struct LocationAdvisory {
    pub id: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationOutcome {
    /// Valid records, scored and marked `VALIDATED`, in input order
    pub accepted: Vec<Record>,
    pub rejected: Vec<RejectedRecord>,
    pub location_advisories: Vec<LocationAdvisory>,
}

/// Score distribution over a batch of records
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct QualityStats {
    pub total: usize,
    pub average_score: f64,
    pub high_quality: usize,
    pub medium_quality: usize,
    pub low_quality: usize,
    pub high_quality_pct: f64,
    pub medium_quality_pct: f64,
    pub low_quality_pct: f64,
}

/// Rejects malformed records and scores the rest on enrichment completeness.
///
/// Rejection covers the required fields, company name and title lengths, and the job URL
/// shape. Location plausibility is only reported, never a rejection cause.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordValidator;

impl RecordValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check a single record, reporting the first rule it breaks
    pub fn validate(&self, record: &Record) -> Result<(), RejectionReason> {
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !record.has_field(f)) {
            return Err(RejectionReason::MissingField(*missing));
        }

        let company_len = char_len(record.company_name.as_str());
        if !(MIN_TEXT_LENGTH..=MAX_TEXT_LENGTH).contains(&company_len) {
            return Err(RejectionReason::EntityNameLength(company_len));
        }

        let title_len = char_len(record.title.as_str());
        if !(MIN_TEXT_LENGTH..=MAX_TEXT_LENGTH).contains(&title_len) {
            return Err(RejectionReason::TitleLength(title_len));
        }

        let url = record.url.as_str().unwrap_or_default();
        if !URL_PATTERN.is_match(url) {
            return Err(RejectionReason::InvalidUrl(url.to_string()));
        }

        Ok(())
    }

    /// Validate a batch. Survivors get their score and `VALIDATED` status
    pub fn validate_all(&self, records: Vec<Record>) -> ValidationOutcome {
        info!("Validating {} records", records.len());
        let mut outcome = ValidationOutcome::default();

        for mut record in records {
            match self.validate(&record) {
                Ok(()) => {
                    if let Some(location) = record.location.as_str() {
                        if !self.is_plausible_location(location) {
                            debug!(id = %record.id, %location, "Unrecognised location");
                            outcome.location_advisories.push(LocationAdvisory {
                                id: record.id.clone(),
                                location: location.to_string(),
                            });
                        }
                    }
                    record.quality_score = Some(self.quality_score(&record));
                    record.validation_status = ValidationStatus::Validated;
                    outcome.accepted.push(record);
                }
                Err(reason) => {
                    warn!(id = %record.id, %reason, "Invalid record");
                    record.validation_status = ValidationStatus::Rejected;
                    outcome.rejected.push(RejectedRecord { record, reason });
                }
            }
        }

        info!(
            "Validation complete: {} valid, {} rejected",
            outcome.accepted.len(),
            outcome.rejected.len()
        );
        outcome
    }

    /// `0.6 * required share + 0.4 * optional share`, rounded to 2 decimals
    pub fn quality_score(&self, record: &Record) -> f64 {
        let required = present_share(record, &REQUIRED_FIELDS);
        let optional = present_share(record, &OPTIONAL_FIELDS);
        round_to(0.6 * required + 0.4 * optional, 2)
    }

    /// Whether the location names a US state code, the country, or a major US city
    pub fn is_plausible_location(&self, location: &str) -> bool {
        let upper = location.to_uppercase();
        let has_state_code = upper
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|token| US_STATE_CODES.contains(&token));
        has_state_code
            || upper.contains("UNITED STATES")
            || upper.contains("USA")
            || US_MAJOR_CITIES.iter().any(|city| upper.contains(city))
    }

    /// Bucket scores into high (>= 0.8), medium (>= 0.5) and low.
    ///
    /// Records that were never scored are scored on the fly; the input is not modified.
    pub fn get_quality_stats(&self, records: &[Record]) -> QualityStats {
        if records.is_empty() {
            return QualityStats::default();
        }

        let scores: Vec<f64> = records
            .iter()
            .map(|r| r.quality_score.unwrap_or_else(|| self.quality_score(r)))
            .collect();

        let total = scores.len();
        let high = scores.iter().filter(|&&s| s >= 0.8).count();
        let medium = scores.iter().filter(|&&s| (0.5..0.8).contains(&s)).count();
        let low = total - high - medium;
        let pct = |count: usize| round_to(count as f64 / total as f64 * 100.0, 1);

        QualityStats {
            total,
            average_score: round_to(scores.iter().sum::<f64>() / total as f64, 2),
            high_quality: high,
            medium_quality: medium,
            low_quality: low,
            high_quality_pct: pct(high),
            medium_quality_pct: pct(medium),
            low_quality_pct: pct(low),
        }
    }
}

fn char_len(value: Option<&str>) -> usize {
    value.map(|v| v.chars().count()).unwrap_or_default()
}

fn present_share(record: &Record, fields: &[&str]) -> f64 {
    let present = fields.iter().filter(|f| record.has_field(f)).count();
    present as f64 / fields.len() as f64
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
