//! Structural comparison of two lab records.
//!
//! Tests are matched by [`TestKey`](crate::TestKey) and parameters by name.
//! Duplicate keys inside one record resolve to the later entry; ordering of
//! every output list follows first occurrence in the record it was taken from.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::keyed::KeyedIndex;
use crate::{DetailEntry, StructuredRecord, TestResult};

pub const NO_BASELINE_MESSAGE: &str = "No previous data available for comparison.";
pub const NO_CHANGES_MESSAGE: &str = "No changes detected in the patient data.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueChange {
    pub previous: Option<String>,
    pub current: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum DetailChange {
    #[serde(rename = "new_detail")]
    Added {
        #[serde(rename = "test")]
        parameter: Option<String>,
        current: DetailEntry,
    },
    #[serde(rename = "removed_detail")]
    Removed {
        #[serde(rename = "test")]
        parameter: Option<String>,
        previous: DetailEntry,
    },
    /// Only the result value is compared; units ride along for display.
    #[serde(rename = "changed_result")]
    Changed {
        #[serde(rename = "test")]
        parameter: Option<String>,
        previous: Option<String>,
        current: Option<String>,
        units: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestChange {
    pub test_name: Option<String>,
    pub bill_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ValueChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detail_changes: Vec<DetailChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChangeSet {
    /// Keyed by field, in the current record's field order.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub personal_details: IndexMap<String, ValueChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_tests: Vec<TestResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed_tests: Vec<TestChange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_tests: Vec<TestResult>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.personal_details.is_empty()
            && self.new_tests.is_empty()
            && self.changed_tests.is_empty()
            && self.removed_tests.is_empty()
    }
}

/// Outcome of [`diff`]. An empty change set is never exposed; it becomes
/// [`DiffResult::NoChanges`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffResult {
    NoBaseline,
    NoChanges,
    Changes(ChangeSet),
}

impl DiffResult {
    /// Marker text for the two change-free outcomes.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            DiffResult::NoBaseline => Some(NO_BASELINE_MESSAGE),
            DiffResult::NoChanges => Some(NO_CHANGES_MESSAGE),
            DiffResult::Changes(_) => None,
        }
    }

    pub fn changes(&self) -> Option<&ChangeSet> {
        match self {
            DiffResult::Changes(set) => Some(set),
            _ => None,
        }
    }
}

impl Serialize for DiffResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DiffResult::Changes(set) => set.serialize(serializer),
            marker => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("message", &marker.message())?;
                map.end()
            }
        }
    }
}

/// Compare `current` against `previous`. Neither input is modified.
pub fn diff(current: &StructuredRecord, previous: Option<&StructuredRecord>) -> DiffResult {
    let Some(previous) = previous else {
        return DiffResult::NoBaseline;
    };

    let mut set = ChangeSet::default();

    for (field, value) in &current.personal_details {
        let prev = previous.personal_details.get(field);
        if prev != Some(value) {
            set.personal_details.insert(
                field.clone(),
                ValueChange {
                    previous: prev.cloned(),
                    current: Some(value.clone()),
                },
            );
        }
    }

    let current_tests = KeyedIndex::build(&current.tests, TestResult::key);
    let previous_tests = KeyedIndex::build(&previous.tests, TestResult::key);

    for (key, test) in current_tests.iter() {
        match previous_tests.get(key) {
            None => set.new_tests.push(test.clone()),
            Some(before) => {
                if let Some(change) = compare_tests(test, before) {
                    set.changed_tests.push(change);
                }
            }
        }
    }

    set.removed_tests = previous_tests
        .iter()
        .filter(|(key, _)| !current_tests.contains(key))
        .map(|(_, test)| test.clone())
        .collect();

    if set.is_empty() {
        DiffResult::NoChanges
    } else {
        DiffResult::Changes(set)
    }
}

fn compare_tests(current: &TestResult, previous: &TestResult) -> Option<TestChange> {
    let status = (current.status != previous.status).then(|| ValueChange {
        previous: previous.status.clone(),
        current: current.status.clone(),
    });

    let detail_changes = compare_details(&current.details, &previous.details);

    if status.is_none() && detail_changes.is_empty() {
        return None;
    }

    Some(TestChange {
        test_name: current.test_name.clone(),
        bill_date: current.bill_date.clone(),
        status,
        detail_changes,
    })
}

fn compare_details(current: &[DetailEntry], previous: &[DetailEntry]) -> Vec<DetailChange> {
    let parameter_of = |d: &DetailEntry| d.parameter.clone();
    let current_details = KeyedIndex::build(current, parameter_of);
    let previous_details = KeyedIndex::build(previous, parameter_of);

    let mut changes = Vec::new();
    for (parameter, detail) in current_details.iter() {
        match previous_details.get(parameter) {
            None => changes.push(DetailChange::Added {
                parameter: parameter.clone(),
                current: detail.clone(),
            }),
            Some(before) if before.result != detail.result => {
                changes.push(DetailChange::Changed {
                    parameter: parameter.clone(),
                    previous: before.result.clone(),
                    current: detail.result.clone(),
                    units: detail.units.clone(),
                })
            }
            Some(_) => {}
        }
    }

    for (parameter, detail) in previous_details.iter() {
        if !current_details.contains(parameter) {
            changes.push(DetailChange::Removed {
                parameter: parameter.clone(),
                previous: detail.clone(),
            });
        }
    }

    changes
}
