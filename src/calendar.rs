//! Millisecond timestamps to calendar dates.
//!
//! Conversion is fallible and never raises: a timestamp outside the range the
//! calendar can represent simply has no date.

use crate::model::CalendarDate;
use time::OffsetDateTime;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// UTC calendar date of `timestamp_ms`, or `None` when out of range.
#[must_use]
pub fn calendar_date(timestamp_ms: i64) -> Option<CalendarDate> {
    let nanos = i128::from(timestamp_ms) * NANOS_PER_MILLI;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
    Some(CalendarDate {
        day: dt.day(),
        month: u8::from(dt.month()),
        year: dt.year(),
    })
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / NANOS_PER_MILLI;
    i64::try_from(millis).unwrap_or(i64::MAX)
}
