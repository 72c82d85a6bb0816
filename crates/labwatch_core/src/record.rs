use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Personal fields of a report, keyed by field name (`registration_no`,
/// `patient_name`, `age`, `sex`). Missing fields are absent, never empty.
/// Iteration follows the order the fields appear on the page.
pub type PersonalDetails = IndexMap<String, String>;

/// One measured parameter inside a test. Identity within a test is the
/// parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetailEntry {
    #[serde(rename = "slno", default, skip_serializing_if = "Option::is_none")]
    pub sl_no: Option<String>,
    #[serde(rename = "test", default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Vec<DetailEntry>,
}

/// Composite identity of a test within a record. An absent name or date
/// matches an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestKey {
    pub test_name: String,
    pub bill_date: String,
}

impl TestResult {
    pub fn key(&self) -> TestKey {
        TestKey {
            test_name: self.test_name.clone().unwrap_or_default(),
            bill_date: self.bill_date.clone().unwrap_or_default(),
        }
    }
}

/// The unit compared by the diff engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructuredRecord {
    #[serde(default)]
    pub personal_details: PersonalDetails,
    #[serde(default)]
    pub tests: Vec<TestResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("record root must be a JSON object")]
    NotAnObject,
    #[error("record has neither `personal_details` nor `tests`")]
    MissingSections,
    #[error("personal detail `{field}` must be a string or null")]
    InvalidPersonalField { field: String },
    #[error("record has an unexpected shape: {0}")]
    InvalidShape(String),
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(default)]
    personal_details: IndexMap<String, Value>,
    #[serde(default)]
    tests: Vec<TestResult>,
}

/// Parse a record from its JSON text form.
///
/// # Errors
///
/// - `InvalidJson` when the text is not JSON at all
/// - `NotAnObject` / `MissingSections` when the root is not a lab record
/// - `InvalidPersonalField` / `InvalidShape` when a value has the wrong kind
pub fn parse_record(text: &str) -> Result<StructuredRecord, RecordError> {
    let raw: Value =
        serde_json::from_str(text).map_err(|e| RecordError::InvalidJson(e.to_string()))?;

    let obj = raw.as_object().ok_or(RecordError::NotAnObject)?;
    if !obj.contains_key("personal_details") && !obj.contains_key("tests") {
        return Err(RecordError::MissingSections);
    }

    let parsed: RawRecord =
        serde_json::from_value(raw).map_err(|e| RecordError::InvalidShape(e.to_string()))?;

    let mut personal_details = PersonalDetails::new();
    for (field, value) in parsed.personal_details {
        match value {
            Value::String(text) => {
                personal_details.insert(field, text);
            }
            Value::Null => {}
            _ => return Err(RecordError::InvalidPersonalField { field }),
        }
    }

    Ok(StructuredRecord {
        personal_details,
        tests: parsed.tests,
    })
}
