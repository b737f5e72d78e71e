use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::ProcessingReport;
use crate::types::Record;

/// An input element that could not be read as a record
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRecord {
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedRecords {
    pub records: Vec<Record>,
    pub skipped: Vec<SkippedRecord>,
}

/// Read a JSON array of raw records.
///
/// A malformed file is an error; a malformed element is skipped and reported so one bad
/// record never aborts the batch.
pub fn load_raw_records(path: &Path) -> Result<LoadedRecords> {
    let contents = fs::read_to_string(path)?;
    let elements: Vec<serde_json::Value> = serde_json::from_str(&contents)?;

    let mut loaded = LoadedRecords::default();
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<Record>(element) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                warn!(index, error = %e, "Skipping unreadable record");
                loaded.skipped.push(SkippedRecord {
                    index,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        "Loaded {} records from {} ({} skipped)",
        loaded.records.len(),
        path.display(),
        loaded.skipped.len()
    );
    Ok(loaded)
}

fn timestamped_path(dir: &Path, prefix: &str, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("{}_{}.{}", prefix, timestamp, extension))
}

/// Write processed records as pretty JSON to `processed_jobs_<timestamp>.json` in `dir`
pub fn save_processed_records(records: &[Record], dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = timestamped_path(dir, "processed_jobs", "json");

    let mut writer = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;

    info!("Saved {} processed records to {}", records.len(), path.display());
    Ok(path)
}

/// Write the plain-text report summary next to the processed records
pub fn save_report_summary(report: &ProcessingReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = timestamped_path(dir, "processing_summary", "txt");
    fs::write(&path, report.to_string())?;
    info!("Saved processing summary to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use tempfile::tempdir;

    #[test]
    fn test_bad_elements_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.json");
        fs::write(
            &path,
            r#"[
                {"job_id": "IND_1", "job_title": "Engineer", "company_name": "Acme"},
                {"job_title": "No id"},
                {"job_id": "IND_2", "location": ["not", "text"]},
                {"job_id": "IND_3", "company_name": "Globex"}
            ]"#,
        )
        .unwrap();

        let loaded = load_raw_records(&path).unwrap();
        let ids: Vec<&str> = loaded.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["IND_1", "IND_3"]);
        assert_eq!(
            loaded.skipped.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_non_array_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("raw.json");
        fs::write(&path, r#"{"job_id": "IND_1"}"#).unwrap();
        assert!(load_raw_records(&path).is_err());
    }

    #[test]
    fn test_save_names_file_with_timestamp() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("processed");
        let records = vec![Record::new("IND_1").with_field(FIELD_TITLE, "Engineer")];

        let path = save_processed_records(&records, &out).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("processed_jobs_"));
        assert!(name.ends_with(".json"));
        // processed_jobs_YYYYmmdd_HHMMSS.json
        assert_eq!(name.len(), "processed_jobs_".len() + 15 + ".json".len());

        let reloaded = load_raw_records(&path).unwrap();
        assert_eq!(reloaded.records, records);
    }
}
