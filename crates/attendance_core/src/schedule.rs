//! crates/attendance_core/src/schedule.rs
//!
//! Resolves a recurring weekly timing entry to its concrete next (or
//! current-day) occurrence relative to a reference instant.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};

use crate::domain::TimingEntry;

/// Canonical weekday names, indexed Sunday=0 through Saturday=6.
pub const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Schedule-input errors. These mark a single timing entry as unusable;
/// evaluation of the remaining entries continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("unrecognized day name: {0:?}")]
    InvalidDay(String),
    #[error("unparseable 12-hour time: {0:?}")]
    InvalidTime(String),
}

/// Maps a day name to its canonical index, case-insensitively.
fn day_index(name: &str) -> Option<u32> {
    DAY_NAMES
        .iter()
        .position(|d| d.eq_ignore_ascii_case(name.trim()))
        .map(|i| i as u32)
}

/// Parses a 12-hour clock string of the shape `H:MM(AM|PM)`.
///
/// The meridiem is case-insensitive and may be preceded by a space
/// ("10:00 AM" appears in older stored schedules). Hour must be 1-12,
/// minute exactly two digits.
pub fn parse_clock_12h(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let invalid = || ScheduleError::InvalidTime(raw.to_string());

    let upper = raw.trim().to_ascii_uppercase();
    let (body, is_pm) = if let Some(rest) = upper.strip_suffix("PM") {
        (rest, true)
    } else if let Some(rest) = upper.strip_suffix("AM") {
        (rest, false)
    } else {
        return Err(invalid());
    };

    let (hour_str, minute_str) = body.trim_end().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour_str.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }
    if minute_str.len() != 2 {
        return Err(invalid());
    }
    let minute: u32 = minute_str.parse().map_err(|_| invalid())?;

    let hour24 = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    NaiveTime::from_hms_opt(hour24, minute, 0).ok_or_else(invalid)
}

/// Checks that a timing entry would resolve: known day name, parseable
/// start time, and (when present) parseable end time. Used at class
/// creation so malformed schedules are rejected before they are stored.
pub fn validate_entry(timing: &TimingEntry) -> Result<(), ScheduleError> {
    day_index(&timing.day).ok_or_else(|| ScheduleError::InvalidDay(timing.day.clone()))?;
    parse_clock_12h(&timing.start_time)?;
    if let Some(end_time) = &timing.end_time {
        parse_clock_12h(end_time)?;
    }
    Ok(())
}

/// Resolves the occurrence of `timing` anchored to the current or next
/// matching weekday of `reference`.
///
/// Schedules recur weekly and there is no "attendance in advance"
/// semantics, so each entry resolves to exactly one candidate instant:
/// today if the weekday matches, otherwise 1-6 days ahead.
pub fn resolve_occurrence(
    reference: NaiveDateTime,
    timing: &TimingEntry,
) -> Result<NaiveDateTime, ScheduleError> {
    let target = day_index(&timing.day)
        .ok_or_else(|| ScheduleError::InvalidDay(timing.day.clone()))?;
    let start = parse_clock_12h(&timing.start_time)?;

    let current = reference.weekday().num_days_from_sunday();
    let days_ahead = (target + 7 - current) % 7;
    let date = reference.date() + Duration::days(days_ahead as i64);

    Ok(date.and_time(start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timing(day: &str, start_time: &str) -> TimingEntry {
        TimingEntry {
            day: day.to_string(),
            start_time: start_time.to_string(),
            end_time: None,
        }
    }

    // 2024-09-16 is a Monday.
    fn monday_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn twelve_hour_conversions() {
        let cases = [
            ("12:00AM", (0, 0)),
            ("12:00PM", (12, 0)),
            ("1:00PM", (13, 0)),
            ("11:59PM", (23, 59)),
            ("10:00AM", (10, 0)),
            ("10:00 am", (10, 0)),
        ];
        for (raw, (h, m)) in cases {
            let parsed = parse_clock_12h(raw).unwrap();
            assert_eq!(parsed, NaiveTime::from_hms_opt(h, m, 0).unwrap(), "{raw}");
        }
    }

    #[test]
    fn rejects_malformed_times() {
        for raw in ["13:00PM", "0:30AM", "10:5AM", "10:00", "10.00AM", "", "banana"] {
            assert!(
                matches!(parse_clock_12h(raw), Err(ScheduleError::InvalidTime(_))),
                "{raw:?} should not parse"
            );
        }
    }

    #[test]
    fn same_day_resolves_to_today() {
        let occurrence = resolve_occurrence(monday_noon(), &timing("Monday", "10:00AM")).unwrap();
        assert_eq!(occurrence.date(), monday_noon().date());
        assert_eq!(occurrence.time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn other_days_resolve_one_to_six_days_ahead() {
        for (i, name) in DAY_NAMES.iter().enumerate() {
            let occurrence = resolve_occurrence(monday_noon(), &timing(name, "9:30AM")).unwrap();
            let delta = (occurrence.date() - monday_noon().date()).num_days();
            assert_eq!(
                occurrence.weekday().num_days_from_sunday(),
                i as u32,
                "{name}"
            );
            assert!((0..=6).contains(&delta), "{name} resolved {delta} days out");
            if *name != "Monday" {
                assert!(delta >= 1, "{name} must be in the future");
            }
        }
    }

    #[test]
    fn day_names_are_case_insensitive() {
        let occurrence = resolve_occurrence(monday_noon(), &timing("friday", "2:00PM")).unwrap();
        assert_eq!((occurrence.date() - monday_noon().date()).num_days(), 4);
    }

    #[test]
    fn unknown_day_is_invalid() {
        let err = resolve_occurrence(monday_noon(), &timing("Funday", "10:00AM")).unwrap_err();
        assert_eq!(err, ScheduleError::InvalidDay("Funday".to_string()));
    }
}
