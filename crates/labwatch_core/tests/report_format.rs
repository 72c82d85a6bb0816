use chrono::NaiveDate;
use labwatch_core::{
    diff, format_report, ChangeSet, DetailChange, DetailEntry, DiffResult, StructuredRecord,
    TestChange, TestResult, ValueChange, REPORT_HEADER,
};
use pretty_assertions::assert_eq;

fn generated_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_hms_opt(14, 7, 9)
        .unwrap()
}

fn entry(parameter: &str, result: &str, units: &str) -> DetailEntry {
    DetailEntry {
        sl_no: None,
        parameter: Some(parameter.to_string()),
        result: Some(result.to_string()),
        units: Some(units.to_string()),
        range: None,
    }
}

fn named(name: &str, date: &str, details: Vec<DetailEntry>) -> TestResult {
    TestResult {
        bill_no: None,
        bill_date: Some(date.to_string()),
        test_name: Some(name.to_string()),
        status: Some("Completed".to_string()),
        details,
    }
}

#[test]
fn absent_previous_report_only_states_no_comparison() {
    let report = format_report(&diff(&StructuredRecord::default(), None), generated_at());
    assert_eq!(
        report,
        format!(
            "{REPORT_HEADER}\nReport generated: 2024-03-05 14:07:09\n\nNo previous data available for comparison.\n\n"
        )
    );
    assert!(!report.contains("NEW TESTS"));
    assert!(!report.contains("CHANGED TESTS"));
    assert!(!report.contains("REMOVED TESTS"));
    assert!(!report.contains("PERSONAL DETAILS"));
}

#[test]
fn no_changes_report_states_fact() {
    let report = format_report(&DiffResult::NoChanges, generated_at());
    assert!(report.contains("No changes detected in the patient data."));
    assert!(!report.contains("TESTS:"));
}

#[test]
fn sections_render_in_fixed_order() {
    let mut set = ChangeSet::default();
    set.personal_details.insert(
        "age".to_string(),
        ValueChange {
            previous: Some("41 Y".to_string()),
            current: Some("42 Y".to_string()),
        },
    );
    set.new_tests
        .push(named("LFT", "2024-02-01", vec![entry("ALT", "31", "U/L")]));
    set.changed_tests.push(TestChange {
        test_name: Some("CBC".to_string()),
        bill_date: Some("2024-01-01".to_string()),
        status: Some(ValueChange {
            previous: Some("Pending".to_string()),
            current: Some("Completed".to_string()),
        }),
        detail_changes: vec![
            DetailChange::Added {
                parameter: Some("HB".to_string()),
                current: entry("HB", "13.2", "g/dL"),
            },
            DetailChange::Changed {
                parameter: Some("WBC".to_string()),
                previous: Some("6.1".to_string()),
                current: Some("9.4".to_string()),
                units: Some("10^3/uL".to_string()),
            },
            DetailChange::Removed {
                parameter: Some("PLT".to_string()),
                previous: entry("PLT", "250", "10^3/uL"),
            },
        ],
    });
    set.removed_tests.push(named("ESR", "2023-12-30", vec![]));

    let report = format_report(&DiffResult::Changes(set), generated_at());
    let expected = "\
=== PATIENT DATA CHANGES REPORT ===
Report generated: 2024-03-05 14:07:09

CHANGES IN PERSONAL DETAILS:
  age: 41 Y -> 42 Y

NEW TESTS:
  LFT (2024-02-01)
    - ALT: 31 U/L

CHANGED TESTS:
  CBC (2024-01-01)
    Status: Pending -> Completed
    + ADDED: HB: 13.2 g/dL
    ~ CHANGED: WBC: 6.1 -> 9.4 10^3/uL
    - REMOVED: PLT: 250 10^3/uL

REMOVED TESTS:
  ESR (2023-12-30)

";
    assert_eq!(report, expected);
}

#[test]
fn empty_sections_are_omitted_and_missing_values_marked() {
    let mut set = ChangeSet::default();
    set.personal_details.insert(
        "sex".to_string(),
        ValueChange {
            previous: None,
            current: Some("F".to_string()),
        },
    );
    let report = format_report(&DiffResult::Changes(set), generated_at());
    assert!(report.contains("  sex: (absent) -> F\n"));
    assert!(!report.contains("NEW TESTS:"));
    assert!(!report.contains("CHANGED TESTS:"));
    assert!(!report.contains("REMOVED TESTS:"));
    assert!(!report.contains("No changes"));
}

#[test]
fn blank_units_leave_no_trailing_space() {
    let mut set = ChangeSet::default();
    set.new_tests.push(named(
        "BLOOD GROUPING AND RH TYPING",
        "2024-01-01",
        vec![entry("BLOOD GROUP", "O POSITIVE", "")],
    ));
    let report = format_report(&DiffResult::Changes(set), generated_at());
    assert!(report.contains("    - BLOOD GROUP: O POSITIVE\n"));
}

#[test]
fn personal_changes_are_listed_in_page_order() {
    let mut previous = StructuredRecord::default();
    previous
        .personal_details
        .insert("registration_no".to_string(), "1".to_string());
    let mut current = StructuredRecord::default();
    for (field, value) in [("registration_no", "2"), ("patient_name", "B"), ("age", "9 Y")] {
        current
            .personal_details
            .insert(field.to_string(), value.to_string());
    }

    let report = format_report(&diff(&current, Some(&previous)), generated_at());
    let section = "CHANGES IN PERSONAL DETAILS:\n  registration_no: 1 -> 2\n  patient_name: (absent) -> B\n  age: (absent) -> 9 Y\n";
    assert!(report.contains(section), "{report}");
}
