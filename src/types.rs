use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::constants::*;

/// A text attribute that is either present with a non-blank value or absent.
///
/// `null`, a missing key and a blank string all deserialize to `Absent`, so presence
/// has one meaning for validation and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    Present(String),
    #[default]
    Absent,
}

impl FieldValue {
    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Present(value) => Some(value.as_str()),
            FieldValue::Absent => None,
        }
    }

    /// Rewrite a present value; a blank result becomes `Absent`
    pub fn map_present(self, f: impl FnOnce(&str) -> String) -> Self {
        match self {
            FieldValue::Present(value) => FieldValue::from(f(&value)),
            FieldValue::Absent => FieldValue::Absent,
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        if value.trim().is_empty() {
            FieldValue::Absent
        } else {
            FieldValue::Present(value)
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::from(value.to_string())
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map(FieldValue::from).unwrap_or_default()
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Present(value) => serializer.serialize_str(value),
            FieldValue::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Fetchers occasionally emit numbers (e.g. a head count) where text is expected
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            None | Some(serde_json::Value::Null) => Ok(FieldValue::Absent),
            Some(serde_json::Value::String(s)) => Ok(FieldValue::from(s)),
            Some(serde_json::Value::Number(n)) => Ok(FieldValue::Present(n.to_string())),
            Some(serde_json::Value::Bool(b)) => Ok(FieldValue::Present(b.to_string())),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected a string value, found {}",
                other
            ))),
        }
    }
}

/// Manual review state of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Validated,
    Rejected,
    Other(String),
}

impl From<String> for ValidationStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "" | "PENDING" => ValidationStatus::Pending,
            "VALIDATED" => ValidationStatus::Validated,
            "REJECTED" => ValidationStatus::Rejected,
            _ => ValidationStatus::Other(value),
        }
    }
}

impl From<ValidationStatus> for String {
    fn from(value: ValidationStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Pending => write!(f, "PENDING"),
            ValidationStatus::Validated => write!(f, "VALIDATED"),
            ValidationStatus::Rejected => write!(f, "REJECTED"),
            ValidationStatus::Other(value) => write!(f, "{}", value),
        }
    }
}

/// One listing flowing through the pipeline.
///
/// The serde shape is the flat mapping exchanged with fetchers and exporters; keys the
/// pipeline does not model are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "job_id")]
    pub id: String,
    #[serde(rename = "job_title", default)]
    pub title: FieldValue,
    #[serde(default)]
    pub company_name: FieldValue,
    #[serde(default)]
    pub location: FieldValue,
    #[serde(rename = "job_summary", default)]
    pub summary: FieldValue,
    #[serde(rename = "job_url", default)]
    pub url: FieldValue,
    #[serde(default)]
    pub date_posted: FieldValue,
    #[serde(default)]
    pub date_scraped: FieldValue,
    #[serde(rename = "role_category", default)]
    pub category: FieldValue,
    #[serde(default)]
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub company_size: FieldValue,
    #[serde(rename = "company_revenue_range", default)]
    pub revenue_range: FieldValue,
    #[serde(default)]
    pub funding_stage: FieldValue,
    #[serde(rename = "data_quality_score", default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: FieldValue::Absent,
            company_name: FieldValue::Absent,
            location: FieldValue::Absent,
            summary: FieldValue::Absent,
            url: FieldValue::Absent,
            date_posted: FieldValue::Absent,
            date_scraped: FieldValue::Absent,
            category: FieldValue::Absent,
            validation_status: ValidationStatus::Pending,
            company_size: FieldValue::Absent,
            revenue_range: FieldValue::Absent,
            funding_stage: FieldValue::Absent,
            quality_score: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set a modelled field by its flat-mapping name; unknown names land in `extra`
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.field_mut(name) {
            Some(slot) => *slot = FieldValue::from(value),
            None => {
                self.extra
                    .insert(name.to_string(), serde_json::Value::String(value));
            }
        }
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        let value = match name {
            FIELD_TITLE => &self.title,
            FIELD_COMPANY => &self.company_name,
            FIELD_LOCATION => &self.location,
            FIELD_SUMMARY => &self.summary,
            FIELD_URL => &self.url,
            FIELD_DATE_POSTED => &self.date_posted,
            FIELD_DATE_SCRAPED => &self.date_scraped,
            FIELD_CATEGORY => &self.category,
            FIELD_COMPANY_SIZE => &self.company_size,
            FIELD_REVENUE_RANGE => &self.revenue_range,
            FIELD_FUNDING_STAGE => &self.funding_stage,
            _ => return None,
        };
        Some(value)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        let value = match name {
            FIELD_TITLE => &mut self.title,
            FIELD_COMPANY => &mut self.company_name,
            FIELD_LOCATION => &mut self.location,
            FIELD_SUMMARY => &mut self.summary,
            FIELD_URL => &mut self.url,
            FIELD_DATE_POSTED => &mut self.date_posted,
            FIELD_DATE_SCRAPED => &mut self.date_scraped,
            FIELD_CATEGORY => &mut self.category,
            FIELD_COMPANY_SIZE => &mut self.company_size,
            FIELD_REVENUE_RANGE => &mut self.revenue_range,
            FIELD_FUNDING_STAGE => &mut self.funding_stage,
            _ => return None,
        };
        Some(value)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).map(FieldValue::is_present).unwrap_or(false)
    }

    /// Fetcher-side pre-filter: a listing without company and title is never captured
    pub fn is_capturable(&self) -> bool {
        self.company_name.is_present() && self.title.is_present()
    }

    /// Stamp the ingestion time at capture
    pub fn captured_now(mut self) -> Self {
        self.date_scraped = FieldValue::Present(Utc::now().to_rfc3339());
        self
    }

    /// Build a capture identifier such as `IND_3F2A9C0B1D`.
    ///
    /// Assigned once by the fetcher that captured the listing; the pipeline never calls this.
    pub fn capture_id(source_prefix: &str, company: Option<&str>, title: Option<&str>) -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let data = format!(
            "{}_{}_{}",
            company.unwrap_or_default(),
            title.unwrap_or_default(),
            nanos
        );
        let digest = hex::encode(Sha256::digest(data.as_bytes()));
        format!("{}_{}", source_prefix, digest[..10].to_uppercase())
    }
}
