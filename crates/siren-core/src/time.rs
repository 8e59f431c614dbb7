//! Timestamp helpers shared across the workspace.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current UTC time.
pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// RFC3339 rendering for wire payloads and log lines.
pub fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339)
        .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}
