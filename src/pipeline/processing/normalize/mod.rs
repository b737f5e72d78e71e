use tracing::{debug, info};

use crate::constants::{COMPANY_SUFFIXES, COUNTRY_SUFFIXES};
use crate::types::Record;

/// Field-level text normalization applied before deduplication.
///
/// Every rule is idempotent, so cleaning an already-clean record is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordCleaner;

impl RecordCleaner {
    pub fn new() -> Self {
        Self
    }

    pub fn clean_all(&self, records: Vec<Record>) -> Vec<Record> {
        info!("Cleaning {} records", records.len());
        let cleaned: Vec<Record> = records.into_iter().map(|r| self.clean(r)).collect();
        info!("Cleaning complete");
        cleaned
    }

    pub fn clean(&self, record: Record) -> Record {
        let Record {
            id,
            title,
            company_name,
            location,
            summary,
            url,
            date_posted,
            date_scraped,
            category,
            validation_status,
            company_size,
            revenue_range,
            funding_stage,
            quality_score,
            extra,
        } = record;

        debug!(%id, "Cleaning record");
        Record {
            id,
            title: title.map_present(collapse_whitespace),
            company_name: company_name.map_present(clean_company_name),
            location: location.map_present(clean_location),
            summary: summary.map_present(collapse_whitespace),
            url: url.map_present(collapse_whitespace),
            date_posted: date_posted.map_present(collapse_whitespace),
            date_scraped: date_scraped.map_present(collapse_whitespace),
            category: category.map_present(collapse_whitespace),
            validation_status,
            company_size: company_size.map_present(collapse_whitespace),
            revenue_range: revenue_range.map_present(collapse_whitespace),
            funding_stage: funding_stage.map_present(collapse_whitespace),
            quality_score,
            extra,
        }
    }
}

/// Drop control characters and collapse every whitespace run (newlines and tabs included)
/// to a single space, trimming both ends
pub fn collapse_whitespace(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_legal_suffix(name: &str) -> Option<&str> {
    COMPANY_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .map(str::trim_end)
}

/// Collapse whitespace and strip one trailing legal suffix (", Inc.", " LLC", ...).
///
/// A name whose remainder would still end in a legal suffix ("Acme Inc. LLC") is left
/// whole: stripping only one of a stacked pair would not survive a second pass.
pub fn clean_company_name(name: &str) -> String {
    let name = collapse_whitespace(name);
    match strip_legal_suffix(&name) {
        Some(stripped) if strip_legal_suffix(stripped).is_none() => stripped.to_string(),
        _ => name,
    }
}

fn is_separator(c: char) -> bool {
    c == ' ' || c == ','
}

fn strip_trailing_country(location: &str) -> Option<&str> {
    COUNTRY_SUFFIXES.iter().find_map(|country| {
        let rest = location.strip_suffix(country)?;
        let at_boundary = rest.is_empty() || rest.ends_with(is_separator);
        at_boundary.then(|| rest.trim_end_matches(is_separator))
    })
}

/// Collapse whitespace and strip trailing country names ("United States", "USA")
pub fn clean_location(location: &str) -> String {
    let mut cleaned = collapse_whitespace(location);
    while let Some(rest) = strip_trailing_country(&cleaned) {
        cleaned = rest.to_string();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::types::FieldValue;

    fn messy_record() -> Record {
        Record::new("IND_1")
            .with_field(FIELD_TITLE, "  Senior\n\tEngineer  ")
            .with_field(FIELD_COMPANY, "Acme   Widgets, Inc.")
            .with_field(FIELD_LOCATION, "Austin,  TX, United States")
            .with_field(FIELD_SUMMARY, "Build\u{0007} things\r\nfast")
            .with_field(FIELD_URL, "https://example.com/jobs/1")
            .with_field(FIELD_DATE_SCRAPED, "2024-03-01T10:00:00")
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\n b\tc  "), "a b c");
        assert_eq!(collapse_whitespace("bell\u{0007}ring"), "bellring");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_company_suffixes() {
        assert_eq!(clean_company_name("Acme Inc."), "Acme");
        assert_eq!(clean_company_name("Acme, Inc."), "Acme");
        assert_eq!(clean_company_name("Acme LLC"), "Acme");
        assert_eq!(clean_company_name("Acme Corp."), "Acme");
        assert_eq!(clean_company_name("Acme, Corporation"), "Acme");
        assert_eq!(clean_company_name("Acme Co."), "Acme");
        assert_eq!(clean_company_name("Acme"), "Acme");
        assert_eq!(clean_company_name("Incubator Labs"), "Incubator Labs");
    }

    #[test]
    fn test_stacked_suffixes_are_left_whole() {
        assert_eq!(clean_company_name("Acme Inc. LLC"), "Acme Inc. LLC");
        assert_eq!(
            clean_company_name(&clean_company_name("Acme Inc. LLC")),
            "Acme Inc. LLC"
        );
    }

    #[test]
    fn test_location_country_stripping() {
        assert_eq!(clean_location("Austin, TX, United States"), "Austin, TX");
        assert_eq!(clean_location("Austin, TX, USA"), "Austin, TX");
        assert_eq!(clean_location("Remote USA"), "Remote");
        assert_eq!(clean_location("USA"), "");
        assert_eq!(clean_location("Tulsa, OK"), "Tulsa, OK");
        assert_eq!(clean_location("Seattle, WA, USA, United States"), "Seattle, WA");
        // Not a token boundary
        assert_eq!(clean_location("TUSA"), "TUSA");
    }

    #[test]
    fn test_clean_record_fields() {
        let cleaned = RecordCleaner::new().clean(messy_record());
        assert_eq!(cleaned.id, "IND_1");
        assert_eq!(cleaned.title.as_str(), Some("Senior Engineer"));
        assert_eq!(cleaned.company_name.as_str(), Some("Acme Widgets"));
        assert_eq!(cleaned.location.as_str(), Some("Austin, TX"));
        assert_eq!(cleaned.summary.as_str(), Some("Build things fast"));
        assert_eq!(cleaned.url.as_str(), Some("https://example.com/jobs/1"));
    }

    #[test]
    fn test_padded_url_is_trimmed() {
        let record = Record::new("5").with_field(FIELD_URL, "  https://x.com/a\n");
        let cleaned = RecordCleaner::new().clean(record);
        assert_eq!(cleaned.url.as_str(), Some("https://x.com/a"));
    }

    #[test]
    fn test_extra_fields_pass_through_verbatim() {
        let record = Record::new("6").with_field("source_board", "  Indeed \n");
        let cleaned = RecordCleaner::new().clean(record.clone());
        assert_eq!(cleaned.extra, record.extra);
    }

    #[test]
    fn test_location_that_is_only_a_country_becomes_absent() {
        let record = Record::new("1").with_field(FIELD_LOCATION, "United States");
        let cleaned = RecordCleaner::new().clean(record);
        assert_eq!(cleaned.location, FieldValue::Absent);
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let cleaner = RecordCleaner::new();
        let samples = vec![
            messy_record(),
            Record::new("2")
                .with_field(FIELD_COMPANY, " Foo ,  LLC ")
                .with_field(FIELD_LOCATION, "NY, NY ,USA , USA"),
            Record::new("3")
                .with_field(FIELD_COMPANY, "Bar Co. Inc.")
                .with_field(FIELD_LOCATION, "  "),
            Record::new("4").with_field(FIELD_COMPANY, ", Inc."),
        ];
        for record in samples {
            let once = cleaner.clean(record);
            let twice = cleaner.clean(once.clone());
            assert_eq!(once, twice);
        }
    }
}
