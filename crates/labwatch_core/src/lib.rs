//! Labwatch core: lab record model, structural diff and change reports.
//!
//! Everything in this crate is a pure function of its inputs; no IO happens
//! here beyond parsing text handed in by the caller.
mod diff;
mod keyed;
mod record;
mod report;

pub use diff::{
    diff, ChangeSet, DetailChange, DiffResult, TestChange, ValueChange, NO_BASELINE_MESSAGE,
    NO_CHANGES_MESSAGE,
};
pub use record::{
    parse_record, DetailEntry, PersonalDetails, RecordError, StructuredRecord, TestKey,
    TestResult,
};
pub use report::{format_report, REPORT_HEADER};
