//! crates/attendance_core/src/window.rs
//!
//! The time-window admission check: is the reference instant inside the
//! band around any resolved occurrence of the class schedule?

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::domain::TimingEntry;
use crate::schedule;

/// Half-width of the admission window around an occurrence start, in minutes.
pub const WINDOW_MINUTES: i64 = 5;

/// Returns true when `reference` falls within ±[`WINDOW_MINUTES`] of some
/// timing entry's resolved occurrence start, boundary-inclusive.
///
/// Entries that fail to resolve are skipped rather than treated as fatal,
/// so one malformed entry cannot block an otherwise-valid schedule. An
/// empty timing set never admits. Evaluation short-circuits on the first
/// admitting entry; only existence matters, not which entry admitted.
pub fn is_within_window(reference: NaiveDateTime, timings: &[TimingEntry]) -> bool {
    let half_width = Duration::minutes(WINDOW_MINUTES);

    timings.iter().any(|timing| {
        match schedule::resolve_occurrence(reference, timing) {
            Ok(start) => reference >= start - half_width && reference <= start + half_width,
            Err(err) => {
                debug!(day = %timing.day, start_time = %timing.start_time, %err,
                    "skipping unresolvable timing entry");
                false
            }
        }
    })
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

    // 2024-09-16 is a Monday; class starts 10:00AM that day.
    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 9, 16)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn admits_inside_and_on_the_boundary() {
        let timings = vec![timing("Monday", "10:00AM")];
        assert!(is_within_window(at(10, 0, 0), &timings));
        assert!(is_within_window(at(9, 55, 0), &timings));
        assert!(is_within_window(at(10, 5, 0), &timings));
    }

    #[test]
    fn rejects_one_second_past_the_boundary() {
        let timings = vec![timing("Monday", "10:00AM")];
        assert!(!is_within_window(at(9, 54, 59), &timings));
        assert!(!is_within_window(at(10, 5, 1), &timings));
    }

    #[test]
    fn any_entry_of_a_multi_session_week_admits() {
        let timings = vec![timing("Wednesday", "10:00AM"), timing("Monday", "1:00PM")];
        assert!(is_within_window(at(13, 2, 0), &timings));
        assert!(!is_within_window(at(10, 0, 0), &timings)); // Wednesday session, not today
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let timings = vec![timing("Funday", "10:00AM"), timing("Monday", "10:00AM")];
        assert!(is_within_window(at(10, 3, 0), &timings));

        let only_bad = vec![timing("Funday", "10:00AM")];
        assert!(!is_within_window(at(10, 3, 0), &only_bad));
    }

    #[test]
    fn empty_schedule_never_admits() {
        assert!(!is_within_window(at(10, 0, 0), &[]));
    }
}
