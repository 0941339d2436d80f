use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::errors::SnapshotError;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S %z"];

/// Look up a tz database zone such as `America/New_York`
///
/// # Errors
///
/// `UnknownTimeZone` if the name is not in the tz database.
pub fn parse_zone(name: &str) -> Result<Tz, SnapshotError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| SnapshotError::UnknownTimeZone {
            zone: name.to_string(),
        })
}

/// Parse a timestamp written in `input` and express it in `output`
///
/// Strings carrying their own offset (RFC 3339, `… -0500`, `… UTC`) ignore
/// `input`. Naive strings are read as wall-clock time in `input`; a bare
/// date means midnight. Ambiguous wall-clock times (DST fall-back) resolve
/// to the earlier instant. Blank input yields `None`.
///
/// # Errors
///
/// `InvalidTimestamp` if the string matches no supported format or names a
/// wall-clock time skipped by a DST transition.
pub fn parse_time(
    value: &str,
    input: Tz,
    output: Tz,
) -> Result<Option<DateTime<Tz>>, SnapshotError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Some(instant) = parse_with_offset(value) {
        return Ok(Some(instant.with_timezone(&output)));
    }

    let naive = parse_naive(value).ok_or_else(|| SnapshotError::InvalidTimestamp {
        value: value.to_string(),
        reason: "unrecognised timestamp format".to_string(),
    })?;

    let local = input
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| SnapshotError::InvalidTimestamp {
            value: value.to_string(),
            reason: format!("does not exist in {}", input.name()),
        })?;

    Ok(Some(local.with_timezone(&output)))
}

fn parse_with_offset(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(stripped) = value.strip_suffix(" UTC") {
        return parse_naive(stripped).map(|naive| Utc.from_utc_datetime(&naive));
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
