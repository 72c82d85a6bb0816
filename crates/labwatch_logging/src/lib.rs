#![deny(missing_docs)]
//! Shared logging utilities for the labwatch workspace.
//!
//! This crate provides the `watch_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! prefixed with the current polling cycle so that interleaved output from a
//! long-running monitor can be grouped by pass.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide polling cycle counter. Zero until the scheduler starts.
static CYCLE: AtomicU64 = AtomicU64::new(0);

/// Sets the polling cycle number stamped into subsequent log lines.
/// The scheduler calls this once at the start of every pass.
pub fn set_cycle(cycle: u64) {
    CYCLE.store(cycle, Ordering::Relaxed);
}

/// Returns the polling cycle number, or 0 outside the scheduler.
pub fn current_cycle() -> u64 {
    CYCLE.load(Ordering::Relaxed)
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! watch_trace {
    ($($arg:tt)*) => {{
        log::trace!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! watch_debug {
    ($($arg:tt)*) => {{
        log::debug!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! watch_info {
    ($($arg:tt)*) => {{
        log::info!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! watch_warn {
    ($($arg:tt)*) => {{
        log::warn!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! watch_error {
    ($($arg:tt)*) => {{
        log::error!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
