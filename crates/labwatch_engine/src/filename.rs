use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;

use crate::TargetError;

/// Produces the label used to name one snapshot's files.
pub type TimestampSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Sortable, filename-safe `YYYYMMDD_HHMMSS_ZONE` stamps in `tz`.
/// Each call reads the clock afresh.
pub fn zoned_timestamps(tz: Tz) -> TimestampSource {
    Arc::new(move || {
        let now = Utc::now().with_timezone(&tz);
        sanitize_label(&now.format("%Y%m%d_%H%M%S_%Z").to_string())
    })
}

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_label(input: &str) -> String {
    input
        .chars()
        .map(|c| if is_forbidden(c) || c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Target ids become directory names, so they must stay inside the archive root.
pub fn validate_target_id(id: &str) -> Result<(), TargetError> {
    if id.is_empty() {
        return Err(TargetError::EmptyId);
    }
    let unsafe_id = id == "."
        || id == ".."
        || id.chars().any(|c| is_forbidden(c) || c.is_whitespace())
        || id.ends_with('.')
        || is_reserved_windows_name(id);
    if unsafe_id {
        return Err(TargetError::UnsafeId(id.to_string()));
    }
    Ok(())
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
