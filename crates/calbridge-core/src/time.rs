//! Time ranges for calendar queries.
//!
//! Google Calendar takes `timeMin`/`timeMax`/`updatedMin` as RFC 3339
//! timestamps with an explicit offset. [`TimeRange`] keeps the caller's
//! offset so a "day" query covers the day as the caller sees it.

use chrono::{DateTime, FixedOffset, NaiveTime, SecondsFormat, TimeZone};
use thiserror::Error;

/// Errors raised when building a [`TimeRange`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    /// The range would end before it starts.
    #[error("time range start {start} is after end {end}")]
    Inverted { start: String, end: String },
}

/// Formats a timestamp the way the Calendar API expects it.
///
/// Seconds precision, numeric offset (`+00:00` rather than `Z`).
pub fn to_rfc3339<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// A closed time interval `[start, end]` with a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Start of the range (inclusive).
    pub start: DateTime<FixedOffset>,
    /// End of the range (inclusive).
    pub end: DateTime<FixedOffset>,
}

impl TimeRange {
    /// Creates a range, rejecting one whose start is after its end.
    pub fn new<Tz: TimeZone>(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self, TimeRangeError> {
        let start = start.fixed_offset();
        let end = end.fixed_offset();
        if start > end {
            return Err(TimeRangeError::Inverted {
                start: to_rfc3339(&start),
                end: to_rfc3339(&end),
            });
        }
        Ok(Self { start, end })
    }

    /// The whole calendar day containing `instant`, in `instant`'s own offset.
    ///
    /// Runs from 00:00:00 to 23:59:59 inclusive.
    pub fn for_day<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        let local = instant.fixed_offset();
        let offset = *local.offset();
        let date = local.date_naive();

        // Fixed offsets have no gaps or folds, so every wall-clock time is single.
        let at = |time: NaiveTime| {
            offset
                .from_local_datetime(&date.and_time(time))
                .single()
                .unwrap_or(local)
        };
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);

        Self {
            start: at(NaiveTime::MIN),
            end: at(end_of_day),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn rfc3339_uses_numeric_offset() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(to_rfc3339(&dt), "2024-03-15T10:00:00+00:00");

        let paris = offset(1).with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(to_rfc3339(&paris), "2024-03-15T10:00:00+01:00");
    }

    #[test]
    fn new_rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let err = TimeRange::new(start, end).unwrap_err();
        assert!(matches!(err, TimeRangeError::Inverted { .. }));
    }

    #[test]
    fn new_accepts_empty_range() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let range = TimeRange::new(at, at).unwrap();
        assert_eq!(range.start, range.end);
    }

    #[test]
    fn for_day_keeps_callers_offset() {
        let instant = offset(2).with_ymd_and_hms(2024, 6, 1, 15, 42, 7).unwrap();
        let range = TimeRange::for_day(&instant);
        assert_eq!(to_rfc3339(&range.start), "2024-06-01T00:00:00+02:00");
        assert_eq!(to_rfc3339(&range.end), "2024-06-01T23:59:59+02:00");
    }

    #[test]
    fn for_day_covers_the_instant() {
        let instant = offset(-5).with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        let range = TimeRange::for_day(&instant);
        assert!(range.start <= instant && instant <= range.end);

        let next_day = offset(-5).with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(next_day > range.end);
    }
}
