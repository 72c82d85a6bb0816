//! Logger setup for the `labwatch` binary.
//!
//! Terminal output goes to stderr so that command output on stdout stays
//! machine-readable. A log file, when requested, is appended to.

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Install the global logger. Safe to call once per process.
pub fn initialize(verbose: bool, log_file: Option<&Path>) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(file_logger) = log_file.and_then(|path| create_file_logger(path, level, config)) {
        loggers.push(file_logger);
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", path, err);
            None
        }
    }
}
