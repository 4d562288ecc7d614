//! Date normalisation and calendar layout
//!
//! Rentals and bookings are stored as inclusive ranges of calendar days. Any
//! instant coming from a client or an external feed is first mapped to the
//! calendar day it falls on in the viewer's timezone, so the same record
//! renders on the same days no matter where the server runs.

use crate::domain::types::DateRange;
use crate::error::{InventoryError, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A day given either as `YYYY-MM-DD` or as an RFC 3339 timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum DateInput {
    Date(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
}

impl DateInput {
    /// Calendar day in `tz`; plain dates are taken as-is
    pub fn to_local_date(&self, tz: Tz) -> NaiveDate {
        match self {
            DateInput::Date(date) => *date,
            DateInput::Timestamp(ts) => ts.with_timezone(&tz).date_naive(),
        }
    }
}

impl From<NaiveDate> for DateInput {
    fn from(date: NaiveDate) -> Self {
        DateInput::Date(date)
    }
}

/// Build an inclusive range from two client inputs
pub fn resolve_range(start: &DateInput, end: &DateInput, tz: Tz) -> Result<DateRange> {
    DateRange::new(start.to_local_date(tz), end.to_local_date(tz))
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| InventoryError::InvalidTimezone {
            name: name.to_string(),
        })
}

pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

pub fn today(tz: Tz) -> NaiveDate {
    local_date(Utc::now(), tz)
}

/// First valid local instant of `date` in `tz`, as UTC.
///
/// Zones that skip midnight for DST start the day at the end of the gap.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    for minutes in (0..24 * 60).step_by(15) {
        let Some(naive) = date.and_hms_opt(minutes / 60, minutes % 60, 0) else {
            continue;
        };
        if let Some(local) = tz.from_local_datetime(&naive).earliest() {
            return local.with_timezone(&Utc);
        }
    }
    // unreachable for real zones; keep the UTC midnight as a floor
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::default()))
}

/// UTC instants of local midnight and the following local midnight
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(date, tz), start_of_day(date + Duration::days(1), tz))
}

/// Half-open UTC window covering every day of `range` in `tz`
pub fn range_bounds(range: &DateRange, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        start_of_day(range.start(), tz),
        start_of_day(range.end() + Duration::days(1), tz),
    )
}

pub fn month_range(year: i32, month: u32) -> Result<DateRange> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| InventoryError::validation("month", format!("{year}-{month:02} is not a valid month")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| InventoryError::validation("month", "month is out of range"))?;

    DateRange::new(first, next_first - Duration::days(1))
}

/// Parse `YYYY-MM` into the range of that month
pub fn parse_month(value: &str) -> Result<DateRange> {
    let invalid = || InventoryError::validation("month", format!("expected YYYY-MM, got '{value}'"));
    let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    month_range(year, month)
}

/// Days covered by an instant-based event. `ends_at` is exclusive.
pub fn event_period(starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>, tz: Tz) -> DateRange {
    let first = local_date(starts_at, tz);
    let last = match ends_at {
        Some(end) if end > starts_at => local_date(end - Duration::seconds(1), tz),
        _ => first,
    };
    DateRange::new(first, last).unwrap_or_else(|_| DateRange::single(first))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Rental,
    Booking,
    Event,
}

/// Something occupying a range of days on the calendar
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSpan {
    pub kind: EntryKind,
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub period: DateRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CalendarEntry {
    pub kind: EntryKind,
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub period: DateRange,
    /// The span begins on this day
    pub is_start: bool,
    /// The span ends on this day
    pub is_end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// Row of the month grid this day sits in, weeks starting Monday
    pub week: u32,
    pub entries: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CalendarView {
    pub timezone: String,
    pub range: DateRange,
    pub days: Vec<CalendarDay>,
}

/// Lay spans out as one bucket per day of `range`
pub fn build_days(range: &DateRange, spans: &[CalendarSpan]) -> Vec<CalendarDay> {
    let mut visible: Vec<&CalendarSpan> = spans.iter().filter(|s| s.period.overlaps(range)).collect();
    visible.sort_by(|a, b| {
        a.period
            .start()
            .cmp(&b.period.start())
            .then(a.kind.cmp(&b.kind))
            .then(a.title.cmp(&b.title))
    });

    range
        .iter_days()
        .map(|date| CalendarDay {
            date,
            week: week_of_month(date),
            entries: visible
                .iter()
                .filter(|span| span.period.contains(date))
                .map(|span| CalendarEntry {
                    kind: span.kind,
                    id: span.id,
                    title: span.title.clone(),
                    status: span.status.clone(),
                    period: span.period,
                    is_start: date == span.period.start(),
                    is_end: date == span.period.end(),
                })
                .collect(),
        })
        .collect()
}

/// Ordinal of the Monday-based week a day falls in within its month
pub fn week_of_month(date: NaiveDate) -> u32 {
    let first = date.with_day(1).unwrap_or(date);
    let offset = first.weekday().num_days_from_monday();
    (date.day() + offset - 1) / 7 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_timestamp_normalizes_to_viewer_day() {
        let input: DateInput = serde_json::from_str("\"2024-03-10T23:30:00-05:00\"").unwrap();
        assert_eq!(input.to_local_date(Tz::UTC), day("2024-03-11"));
        assert_eq!(
            input.to_local_date(parse_timezone("America/New_York").unwrap()),
            day("2024-03-10")
        );
    }

    #[test]
    fn test_plain_date_is_taken_as_is() {
        let input: DateInput = serde_json::from_str("\"2024-03-10\"").unwrap();
        assert_eq!(input, DateInput::Date(day("2024-03-10")));
        assert_eq!(
            input.to_local_date(parse_timezone("Pacific/Auckland").unwrap()),
            day("2024-03-10")
        );
    }

    #[test]
    fn test_unknown_timezone() {
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(InventoryError::InvalidTimezone { .. })
        ));
    }

    #[test]
    fn test_day_bounds_across_dst_change() {
        let tz = parse_timezone("America/New_York").unwrap();
        // 2024-03-10 is the spring-forward day: 23 hours long
        let (start, end) = day_bounds(day("2024-03-10"), tz);
        assert_eq!(start, utc("2024-03-10T05:00:00Z"));
        assert_eq!(end, utc("2024-03-11T04:00:00Z"));
        assert_eq!((end - start).num_hours(), 23);
    }

    #[test]
    fn test_start_of_day_when_midnight_is_skipped() {
        // Santiago springs forward at local midnight
        let tz = parse_timezone("America/Santiago").unwrap();
        let start = start_of_day(day("2023-09-03"), tz);
        let local = start.with_timezone(&tz);
        assert_eq!(local.date_naive(), day("2023-09-03"));
        assert_eq!(local.format("%H:%M").to_string(), "01:00");
    }

    #[test]
    fn test_month_range_handles_leap_years_and_december() {
        let feb = month_range(2024, 2).unwrap();
        assert_eq!(feb.end(), day("2024-02-29"));
        let dec = month_range(2023, 12).unwrap();
        assert_eq!(dec.end(), day("2023-12-31"));
        assert!(month_range(2024, 13).is_err());
        assert_eq!(parse_month("2024-04").unwrap().days(), 30);
        assert!(parse_month("April").is_err());
    }

    #[test]
    fn test_event_period_treats_end_as_exclusive() {
        let tz = Tz::UTC;
        let period = event_period(
            utc("2024-06-01T18:00:00Z"),
            Some(utc("2024-06-02T00:00:00Z")),
            tz,
        );
        assert_eq!(period, DateRange::single(day("2024-06-01")));

        let multi = event_period(
            utc("2024-06-01T18:00:00Z"),
            Some(utc("2024-06-03T10:00:00Z")),
            tz,
        );
        assert_eq!(multi.days(), 3);

        let no_end = event_period(utc("2024-06-01T18:00:00Z"), None, tz);
        assert_eq!(no_end.days(), 1);
    }

    #[test]
    fn test_build_days_marks_span_edges() {
        let range = DateRange::new(day("2024-05-01"), day("2024-05-04")).unwrap();
        let span = CalendarSpan {
            kind: EntryKind::Rental,
            id: Uuid::new_v4(),
            title: "Tent for Smith".to_string(),
            status: "reserved".to_string(),
            period: DateRange::new(day("2024-04-30"), day("2024-05-02")).unwrap(),
        };
        let outside = CalendarSpan {
            kind: EntryKind::Event,
            id: Uuid::new_v4(),
            title: "Fair".to_string(),
            status: "scheduled".to_string(),
            period: DateRange::single(day("2024-05-10")),
        };

        let days = build_days(&range, &[span.clone(), outside]);
        assert_eq!(days.len(), 4);
        assert_eq!(days[0].entries.len(), 1);
        assert!(!days[0].entries[0].is_start);
        assert!(!days[0].entries[0].is_end);
        assert!(days[1].entries[0].is_end);
        assert!(days[2].entries.is_empty());
        assert!(days[3].entries.is_empty());
    }

    #[test]
    fn test_week_of_month() {
        // 2024-05-01 is a Wednesday
        assert_eq!(week_of_month(day("2024-05-01")), 1);
        assert_eq!(week_of_month(day("2024-05-05")), 1);
        assert_eq!(week_of_month(day("2024-05-06")), 2);
        assert_eq!(week_of_month(day("2024-05-31")), 5);
    }
}
