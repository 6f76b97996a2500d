//! Calendar arithmetic for Monday-based weeks.
//!
//! Weekdays are indexed 0 = Monday .. 6 = Sunday throughout the crate.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const DAY_SHORT_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Monday of the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Sunday of the week containing `date`.
#[must_use]
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

#[must_use]
pub fn week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = week_start(date);
    (start, start + Duration::days(6))
}

#[must_use]
pub fn is_same_week(a: NaiveDate, b: NaiveDate) -> bool {
    week_start(a) == week_start(b)
}

#[must_use]
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Calendar date of `ts` as seen in `tz`.
#[must_use]
pub fn local_date(ts: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Weekday index of `ts` as seen in `tz`.
#[must_use]
pub fn day_of_week_in_tz(ts: &DateTime<Utc>, tz: &Tz) -> u8 {
    weekday_index(local_date(ts, tz))
}

/// Midday on `date` in `tz`, as a UTC instant.
///
/// Completions recorded for a past or explicit date are stamped at noon so
/// that small clock or offset differences never move them to another day.
pub fn local_noon(date: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
    let naive = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| Error::validation(format!("Invalid date {date}")))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| Error::validation(format!("No local noon on {date} in {tz}")))
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| Error::Timezone(name.to_string()))
}

pub fn ensure_monday(date: NaiveDate) -> Result<()> {
    if weekday_index(date) == 0 {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "week_start {date} is a {}, expected a Monday (try {})",
            DAY_NAMES[weekday_index(date) as usize],
            week_start(date)
        )))
    }
}

pub fn weekday_name(day: i64) -> Result<&'static str> {
    usize::try_from(day)
        .ok()
        .and_then(|i| DAY_NAMES.get(i).copied())
        .ok_or_else(|| Error::validation(format!("day_of_week must be between 0 and 6, got {day}")))
}

pub fn weekday_short_name(day: i64) -> Result<&'static str> {
    usize::try_from(day)
        .ok()
        .and_then(|i| DAY_SHORT_NAMES.get(i).copied())
        .ok_or_else(|| Error::validation(format!("day_of_week must be between 0 and 6, got {day}")))
}

/// Parse a weekday from an index ("0".."6"), a full name, or a short name.
pub fn parse_weekday(s: &str) -> Result<u8> {
    let lower = s.trim().to_lowercase();
    if let Ok(n) = lower.parse::<i64>() {
        return crate::models::validate_day_of_week(n);
    }
    DAY_NAMES
        .iter()
        .zip(DAY_SHORT_NAMES.iter())
        .position(|(full, short)| full.to_lowercase() == lower || short.to_lowercase() == lower)
        .map(|i| i as u8)
        .ok_or_else(|| {
            Error::validation(format!(
                "Invalid day '{s}'. Use 0-6, monday-sunday, or mon-sun"
            ))
        })
}

/// Human-readable range such as "Jan 15 - 21, 2026".
#[must_use]
pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    if start.year() == end.year() {
        if start.month() == end.month() {
            format!("{} - {}", start.format("%b %d"), end.format("%d, %Y"))
        } else {
            format!("{} - {}", start.format("%b %d"), end.format("%b %d, %Y"))
        }
    } else {
        format!("{} - {}", start.format("%b %d, %Y"), end.format("%b %d, %Y"))
    }
}
