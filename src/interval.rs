/// Half-open time intervals used by every scheduling comparison.
///
/// An appointment occupies `[start, start + duration)`. Two intervals
/// conflict iff each starts before the other ends, so back-to-back
/// bookings never collide.

use crate::error::Violation;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Weekday};

/// A half-open `[start, end)` range of absolute instants.
///
/// The offset of `start` is kept so that wall-clock checks (clinic hours,
/// work shifts) are evaluated in the zone the caller supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Interval {
    /// Build `[start, start + minutes)`.
    pub fn from_duration(start: DateTime<FixedOffset>, minutes: i64) -> Result<Self, Violation> {
        if minutes <= 0 {
            return Err(Violation::InvalidDuration(minutes));
        }
        let end = Duration::try_minutes(minutes)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or(Violation::InvalidDuration(minutes))?;
        Ok(Interval { start, end })
    }

    /// Parse an ISO-8601 / RFC 3339 timestamp and build the interval from it.
    pub fn parse(appointment_date: &str, minutes: i64) -> Result<Self, Violation> {
        let start = parse_timestamp(appointment_date)?;
        Self::from_duration(start, minutes)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Check if this interval overlaps with another.
    pub fn overlaps_with(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Check if an instant falls within this interval.
    pub fn contains(&self, dt: &DateTime<FixedOffset>) -> bool {
        &self.start <= dt && dt < &self.end
    }

    /// Wall-clock time of the start, in the start's offset.
    pub fn start_time(&self) -> NaiveTime {
        self.start.time()
    }

    /// Wall-clock time of the end, in the start's offset.
    pub fn end_time(&self) -> NaiveTime {
        self.end.with_timezone(self.start.offset()).time()
    }

    /// True when start and end fall on the same local calendar date.
    ///
    /// An interval ending exactly at the following midnight is not same-day.
    pub fn is_same_day(&self) -> bool {
        let end = self.end.with_timezone(self.start.offset());
        self.start.date_naive() == end.date_naive()
    }

    pub fn weekday(&self) -> Weekday {
        self.start.weekday()
    }
}

/// Parse an absolute timestamp such as `2024-12-01T14:30:00Z` or
/// `2024-12-01T14:30:00+07:00`.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, Violation> {
    DateTime::parse_from_rfc3339(value.trim())
        .map_err(|_| Violation::InvalidDateFormat(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ts: &str, minutes: i64) -> Interval {
        Interval::parse(ts, minutes).unwrap()
    }

    #[test]
    fn duration_builds_half_open_range() {
        let interval = at("2024-12-02T10:00:00Z", 30);
        assert_eq!(interval.duration_minutes(), 30);
        assert_eq!(interval.end_time(), NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert!(interval.contains(&interval.start));
        assert!(!interval.contains(&interval.end));
    }

    #[test]
    fn overlap_is_symmetric() {
        let pairs = [
            (at("2024-12-02T10:00:00Z", 30), at("2024-12-02T10:15:00Z", 30)),
            (at("2024-12-02T10:00:00Z", 30), at("2024-12-02T10:30:00Z", 30)),
            (at("2024-12-02T09:00:00Z", 180), at("2024-12-02T10:00:00Z", 5)),
            (at("2024-12-02T10:00:00Z", 30), at("2024-12-03T10:00:00Z", 30)),
        ];
        for (a, b) in pairs {
            assert_eq!(a.overlaps_with(&b), b.overlaps_with(&a));
        }
    }

    #[test]
    fn interval_overlaps_itself() {
        let a = at("2024-12-02T10:00:00Z", 1);
        assert!(a.overlaps_with(&a));
    }

    #[test]
    fn back_to_back_intervals_do_not_overlap() {
        let first = at("2024-12-02T10:00:00Z", 30);
        let second = at("2024-12-02T10:30:00Z", 30);
        assert!(!first.overlaps_with(&second));

        let longer = at("2024-12-02T10:00:00Z", 31);
        assert!(longer.overlaps_with(&second));
    }

    #[test]
    fn offsets_compare_as_absolute_instants() {
        let utc = at("2024-12-02T10:00:00Z", 60);
        let plus_seven = at("2024-12-02T17:30:00+07:00", 30);
        assert!(utc.overlaps_with(&plus_seven));
        assert_eq!(plus_seven.start_time(), NaiveTime::from_hms_opt(17, 30, 0).unwrap());
    }

    #[test]
    fn rejects_non_positive_duration() {
        assert_eq!(
            Interval::parse("2024-12-02T10:00:00Z", 0),
            Err(Violation::InvalidDuration(0))
        );
        assert_eq!(
            Interval::parse("2024-12-02T10:00:00Z", -15),
            Err(Violation::InvalidDuration(-15))
        );
    }

    #[test]
    fn rejects_duration_past_representable_range() {
        for minutes in [i64::MAX, i64::MAX / 1000] {
            assert_eq!(
                Interval::parse("2024-12-02T10:00:00Z", minutes),
                Err(Violation::InvalidDuration(minutes))
            );
        }
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for bad in ["2024-12-02", "2024-13-02T10:00:00Z", "tomorrow", "2024-12-02T10:00:00"] {
            assert!(matches!(
                Interval::parse(bad, 30),
                Err(Violation::InvalidDateFormat(_))
            ));
        }
    }

    #[test]
    fn crossing_midnight_is_not_same_day() {
        assert!(at("2024-12-02T23:00:00Z", 59).is_same_day());
        assert!(!at("2024-12-02T23:30:00Z", 30).is_same_day());
        assert!(!at("2024-12-02T23:30:00Z", 60).is_same_day());
    }

    #[test]
    fn weekday_uses_supplied_offset() {
        // 2024-12-02 is a Monday in UTC but still Sunday in UTC-05:00.
        assert_eq!(at("2024-12-02T02:00:00Z", 30).weekday(), Weekday::Mon);
        assert_eq!(at("2024-12-01T21:00:00-05:00", 30).weekday(), Weekday::Sun);
    }
}
