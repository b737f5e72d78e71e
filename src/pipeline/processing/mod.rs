// Record processing: cleaning, deduplication, validation and scoring

pub mod dedupe;
pub mod normalize;
pub mod quality_gate;

pub use dedupe::{DedupKey, RecordDeduplicator};
pub use normalize::RecordCleaner;
pub use quality_gate::{QualityStats, RecordValidator, RejectionReason};
