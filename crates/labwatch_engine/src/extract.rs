//! Lab report page to [`StructuredRecord`] conversion.

use labwatch_core::{DetailEntry, PersonalDetails, StructuredRecord, TestResult};
use scraper::{ElementRef, Html, Selector};

const RESULTS_TABLE: &str = "table#GView";
const TEST_NAME_ID_PART: &str = "lblTest";
const DETAILS_PANEL_ID_PART: &str = "PnlChild";
const BLOOD_GROUP_TEST: &str = "BLOOD GROUPING AND RH TYPING";
const BLOOD_GROUP_LABEL: &str = "BLOOD GROUP:";

/// Personal detail labels: (element id, fieldset label, record key).
const PERSONAL_FIELDS: &[(&str, &str, &str)] = &[
    ("#lblRegno", "Registration No.", "registration_no"),
    ("#lblName", "Patient Name", "patient_name"),
    ("#lblAge", "Age", "age"),
    ("#lblSex", "Sex", "sex"),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("page has neither personal details nor a results table")]
    NotALabReport,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> Result<StructuredRecord, ExtractError>;
}

/// Extractor for the hospital LIS `Patient_Report.aspx` page layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct LabReportExtractor;

impl Extractor for LabReportExtractor {
    fn extract(&self, html: &str) -> Result<StructuredRecord, ExtractError> {
        let doc = Html::parse_document(html);

        let mut personal_details = personal_from_ids(&doc);
        if personal_details.is_empty() {
            personal_details = personal_from_fieldset(&doc);
        }

        let table = selector(RESULTS_TABLE)
            .as_ref()
            .and_then(|sel| doc.select(sel).next());

        if personal_details.is_empty() && table.is_none() {
            return Err(ExtractError::NotALabReport);
        }

        let tests = table.map(extract_tests).unwrap_or_default();
        Ok(StructuredRecord {
            personal_details,
            tests,
        })
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn id_contains(element: &ElementRef, part: &str) -> bool {
    element.value().id().is_some_and(|id| id.contains(part))
}

fn personal_from_ids(doc: &Html) -> PersonalDetails {
    let mut details = PersonalDetails::new();
    for (css, _, key) in PERSONAL_FIELDS {
        let value = selector(css)
            .as_ref()
            .and_then(|sel| doc.select(sel).next())
            .map(text_of)
            .filter(|v| !v.is_empty());
        if let Some(value) = value {
            details.insert(key.to_string(), value);
        }
    }
    details
}

/// Older layout: label/value `<span>` pairs in alternating cells.
fn personal_from_fieldset(doc: &Html) -> PersonalDetails {
    let mut details = PersonalDetails::new();
    let table = selector("fieldset.moz_fieldset table")
        .as_ref()
        .and_then(|sel| doc.select(sel).next());
    let (Some(table), Some(span)) = (table, selector("span")) else {
        return details;
    };

    for row in table_rows(table) {
        let cells = child_cells(row);
        for pair in cells.chunks_exact(2) {
            let label = pair[0].select(&span).next().map(text_of);
            let value = pair[1].select(&span).next().map(text_of);
            let (Some(label), Some(value)) = (label, value) else {
                continue;
            };
            let key = PERSONAL_FIELDS
                .iter()
                .find(|(_, field_label, _)| *field_label == label)
                .map(|(_, _, key)| *key);
            if let Some(key) = key.filter(|_| !value.is_empty()) {
                details.insert(key.to_string(), value);
            }
        }
    }
    details
}

fn extract_tests(table: ElementRef) -> Vec<TestResult> {
    let span = selector("span");
    let mut tests = Vec::new();
    for row in table_rows(table).into_iter().skip(1) {
        let cells = child_cells(row);
        if cells.len() < 4 {
            continue;
        }
        let name_span = span
            .as_ref()
            .and_then(|sel| cells[2].select(sel).find(|s| id_contains(s, TEST_NAME_ID_PART)));
        let Some(name_span) = name_span else {
            continue;
        };
        let test_name = text_of(name_span);
        let details = if test_name.contains(BLOOD_GROUP_TEST) {
            blood_group_details(row)
        } else {
            measurement_details(row)
        };
        tests.push(TestResult {
            bill_no: Some(text_of(cells[0])),
            bill_date: Some(text_of(cells[1])),
            test_name: Some(test_name),
            status: Some(text_of(cells[3])),
            details,
        });
    }
    tests
}

fn details_panel(row: ElementRef) -> Option<ElementRef> {
    let div = selector("div")?;
    row.select(&div)
        .find(|d| id_contains(d, DETAILS_PANEL_ID_PART))
}

fn measurement_details(row: ElementRef) -> Vec<DetailEntry> {
    let table = details_panel(row).and_then(|panel| {
        let sel = selector("table")?;
        panel.select(&sel).next()
    });
    let Some(table) = table else {
        return Vec::new();
    };

    table_rows(table)
        .into_iter()
        .skip(1)
        .map(child_cells)
        .filter(|cells| cells.len() == 5)
        .map(|cells| {
            let units = text_of(cells[3]);
            let range = strip_unit_suffix(&text_of(cells[4]), &units);
            DetailEntry {
                sl_no: Some(text_of(cells[0])),
                parameter: Some(text_of(cells[1])),
                result: Some(text_of(cells[2])),
                units: Some(units),
                range: Some(range),
            }
        })
        .collect()
}

fn blood_group_details(row: ElementRef) -> Vec<DetailEntry> {
    let Some(panel) = details_panel(row) else {
        return Vec::new();
    };
    let text: String = panel.text().collect();
    let Some((_, after)) = text.split_once(BLOOD_GROUP_LABEL) else {
        return Vec::new();
    };
    vec![DetailEntry {
        sl_no: Some("1".to_string()),
        parameter: Some("BLOOD GROUP".to_string()),
        result: Some(parse_blood_group(after.trim())),
        units: Some(String::new()),
        range: Some(String::new()),
    }]
}

fn parse_blood_group(text: &str) -> String {
    for factor in ["POSITIVE", "NEGATIVE"] {
        if let Some((group, _)) = text.split_once(factor) {
            let group: String = group
                .chars()
                .filter(|c| !matches!(c, '"' | '\'' | '\\' | '_'))
                .collect();
            return format!("{} {factor}", group.trim()).trim().to_string();
        }
    }
    String::new()
}

/// Reference ranges are often rendered with the unit repeated at the end.
fn strip_unit_suffix(range: &str, units: &str) -> String {
    if units.is_empty() {
        return range.to_string();
    }
    range
        .strip_suffix(units)
        .map(str::trim)
        .unwrap_or(range)
        .to_string()
}

/// Rows of `table` itself, looking through row groups but not nested tables.
fn table_rows(table: ElementRef) -> Vec<ElementRef> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn child_cells(row: ElementRef) -> Vec<ElementRef> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
        .collect()
}
