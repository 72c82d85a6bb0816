use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::{ChangeSet, DetailChange, DetailEntry, DiffResult, TestResult};

pub const REPORT_HEADER: &str = "=== PATIENT DATA CHANGES REPORT ===";

const ABSENT: &str = "(absent)";

/// Render a diff as a plain-text report.
///
/// Sections appear only when non-empty, in the order personal details, new
/// tests, changed tests, removed tests. Marker results print their message
/// and nothing else.
pub fn format_report(diff: &DiffResult, generated_at: NaiveDateTime) -> String {
    let mut lines = vec![
        REPORT_HEADER.to_string(),
        format!("Report generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
    ];

    match diff {
        DiffResult::Changes(set) => push_sections(&mut lines, set),
        marker => {
            if let Some(message) = marker.message() {
                lines.push(message.to_string());
                lines.push(String::new());
            }
        }
    }

    let mut out = String::new();
    for line in lines {
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn push_sections(lines: &mut Vec<String>, set: &ChangeSet) {
    if !set.personal_details.is_empty() {
        lines.push("CHANGES IN PERSONAL DETAILS:".to_string());
        for (field, change) in &set.personal_details {
            lines.push(format!(
                "  {field}: {} -> {}",
                show(&change.previous),
                show(&change.current)
            ));
        }
        lines.push(String::new());
    }

    if !set.new_tests.is_empty() {
        lines.push("NEW TESTS:".to_string());
        for test in &set.new_tests {
            lines.push(format!("  {}", test_heading(test)));
            for detail in &test.details {
                lines.push(format!("    - {}", detail_line(detail)));
            }
        }
        lines.push(String::new());
    }

    if !set.changed_tests.is_empty() {
        lines.push("CHANGED TESTS:".to_string());
        for change in &set.changed_tests {
            lines.push(format!(
                "  {} ({})",
                show(&change.test_name),
                show(&change.bill_date)
            ));
            if let Some(status) = &change.status {
                lines.push(format!(
                    "    Status: {} -> {}",
                    show(&status.previous),
                    show(&status.current)
                ));
            }
            for detail in &change.detail_changes {
                lines.push(format!("    {}", detail_change_line(detail)));
            }
        }
        lines.push(String::new());
    }

    if !set.removed_tests.is_empty() {
        lines.push("REMOVED TESTS:".to_string());
        for test in &set.removed_tests {
            lines.push(format!("  {}", test_heading(test)));
        }
        lines.push(String::new());
    }
}

fn detail_change_line(change: &DetailChange) -> String {
    match change {
        DetailChange::Added { current, .. } => format!("+ ADDED: {}", detail_line(current)),
        DetailChange::Removed { previous, .. } => format!("- REMOVED: {}", detail_line(previous)),
        DetailChange::Changed {
            parameter,
            previous,
            current,
            units,
        } => format!(
            "~ CHANGED: {}: {} -> {} {}",
            show(parameter),
            show(previous),
            show(current),
            units.as_deref().unwrap_or_default()
        ),
    }
}

fn test_heading(test: &TestResult) -> String {
    format!("{} ({})", show(&test.test_name), show(&test.bill_date))
}

fn detail_line(detail: &DetailEntry) -> String {
    format!(
        "{}: {} {}",
        show(&detail.parameter),
        show(&detail.result),
        detail.units.as_deref().unwrap_or_default()
    )
}

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(ABSENT)
}
