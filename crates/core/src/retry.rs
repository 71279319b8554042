//! The deferred-retry status convention.
//!
//! A stage that wants the item re-attempted later encodes the deadline
//! inside the status string as `"<stage>: retrying at <RFC3339 UTC>"`.
//! The encoding is textual on purpose: any database backend that stores
//! plain strings (down to a spreadsheet cell) can persist retry state
//! without a separate scheduling store. Cross-run callers parse the
//! deadline, compare against the current time, and either re-attempt or
//! convert the item into a terminal failure once their retry budget runs
//! out.
//!
//! Formatting and parsing live here and nowhere else, so the convention
//! could become a structured field without touching callers.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex_lite::Regex;

static RETRY_RE: Lazy<Regex> = Lazy::new(|| {
    // The timestamp is RFC3339 with a trailing Z, e.g. 2026-08-07T10:30:00Z.
    Regex::new(r"retrying at (\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z)")
        .expect("retry pattern is valid")
});

/// Formats a retry status for `stage` with the given deadline.
pub fn format_retry_status(stage: &str, deadline: DateTime<Utc>) -> String {
    format!(
        "{stage}: retrying at {}",
        deadline.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Extracts the retry deadline from a status string, if it carries one.
pub fn parse_retry_deadline(status: &str) -> Option<DateTime<Utc>> {
    let captures = RETRY_RE.captures(status)?;
    let raw = captures.get(1)?.as_str();
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whether the status encodes a deferred retry at all.
pub fn is_retry_status(status: &str) -> bool {
    parse_retry_deadline(status).is_some()
}

/// Whether a retry-encoded status is due at `now`. `None` when the status
/// carries no deadline.
pub fn retry_due(status: &str, now: DateTime<Utc>) -> Option<bool> {
    parse_retry_deadline(status).map(|deadline| now >= deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_round_trip() {
        let deadline = Utc.with_ymd_and_hms(2026, 8, 7, 10, 30, 0).unwrap();
        let status = format_retry_status("telegram", deadline);
        assert_eq!(status, "telegram: retrying at 2026-08-07T10:30:00Z");
        assert_eq!(parse_retry_deadline(&status), Some(deadline));
    }

    #[test]
    fn test_parse_inside_longer_status() {
        let status = "rate limited, telegram: retrying at 2026-08-07T10:30:00Z (attempt 2)";
        let deadline = parse_retry_deadline(status).unwrap();
        assert_eq!(deadline, Utc.with_ymd_and_hms(2026, 8, 7, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_non_retry_statuses() {
        assert!(!is_retry_status("twitter: success"));
        assert!(!is_retry_status("nothing archived"));
        assert!(parse_retry_deadline("retrying at someday").is_none());
        assert_eq!(retry_due("twitter: success", Utc::now()), None);
    }

    #[test]
    fn test_retry_due_comparison() {
        let deadline = Utc.with_ymd_and_hms(2026, 8, 7, 10, 30, 0).unwrap();
        let status = format_retry_status("vk", deadline);

        let before = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 8, 7, 11, 0, 0).unwrap();
        assert_eq!(retry_due(&status, before), Some(false));
        assert_eq!(retry_due(&status, after), Some(true));
        assert_eq!(retry_due(&status, deadline), Some(true));
    }
}
