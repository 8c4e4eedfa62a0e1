//! Scoring a day's attendance against the schedule.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::schedule::{Schedule, ScheduleKind};

/// Deviations for one employee on one date.
///
/// Lateness is judged once per day against the first entry, early leave
/// once per day against the last exit; a day may hold several sessions
/// from camera retriggers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayDeviation {
    pub is_late: bool,
    pub late_minutes: i64,
    pub is_early_leave: bool,
    pub early_leave_minutes: i64,
    /// Set when the schedule defines no shift for the date: unscheduled
    /// attendance is recorded but never penalized.
    pub is_extra_shift: bool,
}

/// Scores one day's first entry and last exit against the schedule.
pub fn match_day(
    schedule: &Schedule,
    date: NaiveDate,
    first_entry: NaiveDateTime,
    last_exit: Option<NaiveDateTime>,
) -> DayDeviation {
    let Some(window) = schedule.resolve_window(date) else {
        return DayDeviation {
            is_extra_shift: true,
            ..DayDeviation::default()
        };
    };

    let mut deviation = DayDeviation::default();

    if first_entry > window.start {
        let minutes = (first_entry - window.start).num_minutes()
            - i64::from(schedule.allowed_late_minutes);
        if minutes > 0 {
            deviation.is_late = true;
            deviation.late_minutes = minutes;
        }
    }

    // Presence is continuous on round-the-clock rotations; leaving "early"
    // is not a meaningful comparison there.
    if schedule.kind == ScheduleKind::RoundTheClock {
        return deviation;
    }

    if let Some(exit) = last_exit {
        let mut scheduled_end = window.end;
        if window.is_overnight() && exit < window.start {
            // The exit precedes this day's shift: it belongs to the tail of
            // the previous day's shift, so compare against that end.
            if let Some(prev) = schedule.resolve_window(date - Duration::days(1)) {
                scheduled_end = prev.end;
            }
        }
        if exit < scheduled_end {
            let minutes = (scheduled_end - exit).num_minutes()
                - i64::from(schedule.allowed_early_leave_minutes);
            if minutes > 0 {
                deviation.is_early_leave = true;
                deviation.early_leave_minutes = minutes;
            }
        }
    }

    deviation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn ts(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn regular(start: NaiveTime, end: NaiveTime, grace: u32) -> Schedule {
        Schedule {
            kind: ScheduleKind::Regular,
            days_of_week: Some(vec![0, 1, 2, 3, 4]),
            start_time: Some(start),
            end_time: Some(end),
            period_start: None,
            floating_shifts: Vec::new(),
            allowed_late_minutes: grace,
            allowed_early_leave_minutes: grace,
        }
    }

    #[test]
    fn within_grace_is_not_late() {
        let schedule = regular(time(9, 0), time(18, 0), 10);
        // Monday, 8 minutes late, inside the 10-minute grace.
        let d = match_day(&schedule, date("2026-01-05"), ts("2026-01-05T09:08:00"), None);
        assert!(!d.is_late);
        assert_eq!(d.late_minutes, 0);
    }

    #[test]
    fn lateness_is_reduced_by_grace() {
        let schedule = regular(time(9, 0), time(18, 0), 10);
        let d = match_day(&schedule, date("2026-01-05"), ts("2026-01-05T09:25:00"), None);
        assert!(d.is_late);
        assert_eq!(d.late_minutes, 15);
    }

    #[test]
    fn early_leave_against_last_exit() {
        let schedule = regular(time(9, 0), time(18, 0), 10);
        let d = match_day(
            &schedule,
            date("2026-01-05"),
            ts("2026-01-05T09:00:00"),
            Some(ts("2026-01-05T17:20:00")),
        );
        assert!(d.is_early_leave);
        // 40 minutes short, minus 10 grace.
        assert_eq!(d.early_leave_minutes, 30);
        assert!(!d.is_late);
    }

    #[test]
    fn on_time_full_day_is_clean() {
        let schedule = regular(time(9, 0), time(18, 0), 10);
        let d = match_day(
            &schedule,
            date("2026-01-05"),
            ts("2026-01-05T08:55:00"),
            Some(ts("2026-01-05T18:05:00")),
        );
        assert_eq!(d, DayDeviation::default());
    }

    #[test]
    fn no_shift_day_is_extra_shift() {
        let schedule = regular(time(9, 0), time(18, 0), 10);
        // Saturday.
        let d = match_day(
            &schedule,
            date("2026-01-10"),
            ts("2026-01-10T09:30:00"),
            Some(ts("2026-01-10T12:00:00")),
        );
        assert!(d.is_extra_shift);
        assert!(!d.is_late);
        assert!(!d.is_early_leave);
    }

    #[test]
    fn overnight_exit_scored_against_that_days_end() {
        // 22:00-06:00 shift: entry Monday 21:58, exit Tuesday 06:10 belongs
        // to Monday's window, which ends Tuesday 06:00.
        let schedule = regular(time(22, 0), time(6, 0), 0);
        let d = match_day(
            &schedule,
            date("2026-01-05"),
            ts("2026-01-05T21:58:00"),
            Some(ts("2026-01-06T06:10:00")),
        );
        assert!(!d.is_late);
        assert!(!d.is_early_leave);
    }

    #[test]
    fn overnight_exit_before_start_reattributed_to_previous_day() {
        // Exit Tuesday 05:30 arrives while scoring Tuesday: it precedes
        // Tuesday's 22:00 start, so it is held against Monday's 06:00 end.
        let schedule = regular(time(22, 0), time(6, 0), 10);
        let d = match_day(
            &schedule,
            date("2026-01-06"),
            ts("2026-01-06T22:05:00"),
            Some(ts("2026-01-06T05:30:00")),
        );
        assert!(d.is_early_leave);
        // Monday's window ends Tuesday 06:00; 30 minutes short minus 10.
        assert_eq!(d.early_leave_minutes, 20);
    }

    #[test]
    fn round_the_clock_skips_early_leave() {
        let schedule = Schedule {
            kind: ScheduleKind::RoundTheClock,
            days_of_week: None,
            start_time: None,
            end_time: None,
            period_start: Some(time(9, 0)),
            floating_shifts: Vec::new(),
            allowed_late_minutes: 0,
            allowed_early_leave_minutes: 0,
        };
        let d = match_day(
            &schedule,
            date("2026-01-05"),
            ts("2026-01-05T09:30:00"),
            Some(ts("2026-01-05T15:00:00")),
        );
        assert!(d.is_late);
        assert_eq!(d.late_minutes, 30);
        assert!(!d.is_early_leave);
        assert_eq!(d.early_leave_minutes, 0);
    }
}
