//! Scheduled-time parsing for threads
//!
//! Times in the posts file are wall-clock times without an offset, read in
//! the configured zone (`America/Sao_Paulo` unless overridden).

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::types::Thread;
use crate::{Result, ThreadcastError};

/// Format of `scheduled_time` in the posts file
pub const SCHEDULED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a `scheduled_time` value as a time in `tz`
///
/// # Errors
///
/// Returns `InvalidInput` if the string does not match
/// [`SCHEDULED_TIME_FORMAT`] or names a local time skipped by a DST change.
pub fn parse_scheduled_time(input: &str, tz: Tz) -> Result<DateTime<Tz>> {
    let naive = NaiveDateTime::parse_from_str(input.trim(), SCHEDULED_TIME_FORMAT).map_err(|e| {
        ThreadcastError::InvalidInput(format!(
            "Invalid scheduled_time '{}' (expected YYYY-MM-DD HH:MM:SS): {}",
            input, e
        ))
    })?;

    // Ambiguous times (clocks going back) take the earlier instant
    tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        ThreadcastError::InvalidInput(format!(
            "Scheduled time '{}' does not exist in {}",
            input,
            tz.name()
        ))
    })
}

/// When a thread should be published; `None` means immediately
pub fn thread_due_at(thread: &Thread, tz: Tz) -> Result<Option<DateTime<Tz>>> {
    thread
        .scheduled_time
        .as_deref()
        .map(|time| parse_scheduled_time(time, tz))
        .transpose()
}

/// Whether `thread` should be published at `now`
pub fn is_due(thread: &Thread, now: DateTime<Tz>) -> Result<bool> {
    Ok(match thread_due_at(thread, now.timezone())? {
        Some(due) => now >= due,
        None => true,
    })
}
