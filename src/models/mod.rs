pub mod chart;
pub mod metric_record;
pub mod project;
pub mod series;
pub mod source_file;

use chrono::{SecondsFormat, Utc};

/// Current time as RFC 3339 with microseconds, e.g. `2026-10-18T09:30:00.123456+00:00`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
