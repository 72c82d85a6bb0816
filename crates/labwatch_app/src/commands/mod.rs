//! Subcommand implementations.

pub mod diff;
pub mod extract;
pub mod history;
pub mod monitor;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use labwatch_core::{parse_record, StructuredRecord};
use labwatch_engine::{Extractor, LabReportExtractor};

/// Load a record from JSON, or from a saved report page by extension.
pub(crate) fn load_record(path: &Path) -> Result<StructuredRecord> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_page = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    let record = if is_page {
        LabReportExtractor.extract(&text)?
    } else {
        parse_record(&text)?
    };
    Ok(record)
}

/// Print `text` unless `quiet`, and write it to `output` when given.
pub(crate) fn emit(text: &str, output: Option<&Path>, quiet: bool) -> Result<()> {
    if let Some(path) = output {
        fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    }
    if !quiet {
        print!("{text}");
    }
    Ok(())
}
