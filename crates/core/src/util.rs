use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Whole seconds between two API timestamps. Used for logging only; stored timestamps are
/// never reparsed.
pub fn duration_seconds(started_at: Option<&str>, completed_at: Option<&str>) -> Option<i64> {
    let started = OffsetDateTime::parse(started_at?, &Rfc3339).ok()?;
    let completed = OffsetDateTime::parse(completed_at?, &Rfc3339).ok()?;
    Some((completed - started).whole_seconds())
}
