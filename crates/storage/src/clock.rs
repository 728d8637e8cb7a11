#![forbid(unsafe_code)]

use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

const EPOCH_RFC3339: &str = "1970-01-01T00:00:00Z";

/// Wall-clock milliseconds since the Unix epoch, clamped to `0..=i64::MAX`.
pub fn now_ms() -> i64 {
    let elapsed = OffsetDateTime::now_utc() - OffsetDateTime::UNIX_EPOCH;
    i64::try_from(elapsed.whole_milliseconds().max(0)).unwrap_or(i64::MAX)
}

/// Renders a change-log timestamp in UTC. Values outside the calendar range render
/// as the epoch.
pub fn ts_ms_to_rfc3339(ts_ms: i64) -> String {
    OffsetDateTime::UNIX_EPOCH
        .checked_add(Duration::milliseconds(ts_ms))
        .and_then(|stamp| stamp.format(&Rfc3339).ok())
        .unwrap_or_else(|| EPOCH_RFC3339.to_string())
}
