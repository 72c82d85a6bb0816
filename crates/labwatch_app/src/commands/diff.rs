use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use labwatch_core::{diff, format_report, DiffResult};

use super::{emit, load_record};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Current record (.json, or a saved .html report page)
    pub(crate) current: PathBuf,

    /// Previous record; omit when there is no baseline yet
    pub(crate) previous: Option<PathBuf>,

    /// Also write the output to this file
    #[arg(short, long, value_name = "FILE")]
    pub(crate) output: Option<PathBuf>,

    /// Print the change set as JSON instead of the text report
    #[arg(long)]
    pub(crate) json: bool,

    /// Do not print to stdout
    #[arg(short, long)]
    pub(crate) quiet: bool,
}

pub fn execute(args: DiffArgs) -> Result<()> {
    let current = load_record(&args.current)
        .with_context(|| format!("invalid current record {}", args.current.display()))?;
    let previous = args
        .previous
        .as_deref()
        .map(|path| {
            load_record(path)
                .with_context(|| format!("invalid previous record {}", path.display()))
        })
        .transpose()?;

    let result = diff(&current, previous.as_ref());
    let text = render(&result, args.json)?;
    emit(&text, args.output.as_deref(), args.quiet)
}

fn render(result: &DiffResult, json: bool) -> Result<String> {
    if json {
        let mut text = serde_json::to_string_pretty(result)?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(format_report(result, Local::now().naive_local()))
    }
}
