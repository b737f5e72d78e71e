use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::types::Record;

/// Identity of a listing for duplicate detection: `company::title`, lower-cased and trimmed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn of(record: &Record) -> Self {
        let company = record.company_name.as_str().unwrap_or_default();
        let title = record.title.as_str().unwrap_or_default();
        DedupKey(format!(
            "{}::{}",
            company.trim().to_lowercase(),
            title.trim().to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record that lost to another sharing its key
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateDecision {
    pub key: DedupKey,
    pub kept_id: String,
    pub dropped_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    pub records: Vec<Record>,
    pub dropped: Vec<DuplicateDecision>,
}

/// Read-only duplicate census over a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateStats {
    pub total: usize,
    pub unique: usize,
    pub duplicate_count: usize,
    pub duplicate_keys: Vec<DedupKey>,
}

/// Collapses records sharing a [`DedupKey`] down to the most recent one.
///
/// Survivors keep the position of the first record seen for their key, so output order
/// follows first appearance even when a later duplicate wins the recency check.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordDeduplicator;

impl RecordDeduplicator {
    pub fn new() -> Self {
        Self
    }

    pub fn dedupe(&self, records: Vec<Record>) -> DedupOutcome {
        let total = records.len();
        let mut positions: HashMap<DedupKey, usize> = HashMap::new();
        let mut survivors: Vec<Record> = Vec::new();
        let mut dropped = Vec::new();

        for candidate in records {
            let key = DedupKey::of(&candidate);
            match positions.get(&key).copied() {
                None => {
                    positions.insert(key, survivors.len());
                    survivors.push(candidate);
                }
                Some(index) => {
                    let existing = &mut survivors[index];
                    if is_more_recent(existing, &candidate) {
                        debug!(%key, kept = %candidate.id, dropped = %existing.id, "Newer duplicate replaces existing record");
                        let replaced = std::mem::replace(existing, candidate);
                        dropped.push(DuplicateDecision {
                            key,
                            kept_id: existing.id.clone(),
                            dropped_id: replaced.id,
                        });
                    } else {
                        debug!(%key, kept = %existing.id, dropped = %candidate.id, "Duplicate dropped");
                        dropped.push(DuplicateDecision {
                            key,
                            kept_id: existing.id.clone(),
                            dropped_id: candidate.id,
                        });
                    }
                }
            }
        }

        info!(
            "Removed {} duplicates ({} -> {} records)",
            dropped.len(),
            total,
            survivors.len()
        );
        DedupOutcome {
            records: survivors,
            dropped,
        }
    }

    pub fn duplicate_stats(&self, records: &[Record]) -> DuplicateStats {
        let mut counts: HashMap<DedupKey, usize> = HashMap::new();
        for record in records {
            *counts.entry(DedupKey::of(record)).or_insert(0) += 1;
        }

        let mut duplicate_keys: Vec<DedupKey> = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(key, _)| key.clone())
            .collect();
        duplicate_keys.sort();

        DuplicateStats {
            total: records.len(),
            unique: counts.len(),
            duplicate_count: records.len() - counts.len(),
            duplicate_keys,
        }
    }
}

/// Whether `candidate` should replace `existing`.
///
/// Posting dates decide when both records carry one, and an equal date keeps the
/// existing record. Scrape timestamps are consulted only when a posting date is missing.
/// With neither comparable, the first record seen wins.
fn is_more_recent(existing: &Record, candidate: &Record) -> bool {
    if let (Some(current), Some(incoming)) =
        (existing.date_posted.as_str(), candidate.date_posted.as_str())
    {
        return incoming > current;
    }
    match (
        existing.date_scraped.as_str(),
        candidate.date_scraped.as_str(),
    ) {
        (Some(current), Some(incoming)) => incoming > current,
        _ => false,
    }
}
