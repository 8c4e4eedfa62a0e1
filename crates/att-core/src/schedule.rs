//! Work schedule definitions and per-date window resolution.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// How an employee's working hours are defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Fixed weekly hours on a configured day-set.
    #[default]
    Regular,
    /// Per-weekday shift table.
    Floating,
    /// Continuous 24-hour rotation.
    RoundTheClock,
}

impl ScheduleKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Floating => "floating",
            Self::RoundTheClock => "round_the_clock",
        }
    }
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" => Ok(Self::Regular),
            "floating" => Ok(Self::Floating),
            "round_the_clock" => Ok(Self::RoundTheClock),
            _ => Err(format!("invalid schedule kind: {s}")),
        }
    }
}

/// One entry of a floating shift table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloatingShift {
    /// Weekday, 0 = Monday through 6 = Sunday.
    pub weekday: u8,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// One employee's active schedule definition.
///
/// Replaced wholesale on re-import, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub kind: ScheduleKind,
    /// Working weekdays (0 = Monday). `None` means every day.
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    /// Shift start for regular schedules.
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    /// Shift end for regular schedules. May precede `start_time`, meaning
    /// the shift crosses midnight.
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    /// Start-of-period anchor for round-the-clock rotations. 09:00 when
    /// unset.
    #[serde(default)]
    pub period_start: Option<NaiveTime>,
    /// Shift table for floating schedules.
    #[serde(default)]
    pub floating_shifts: Vec<FloatingShift>,
    /// Lateness forgiven before a deviation counts, in minutes.
    #[serde(default)]
    pub allowed_late_minutes: u32,
    /// Early leave forgiven before a deviation counts, in minutes.
    #[serde(default)]
    pub allowed_early_leave_minutes: u32,
}

/// A schedule as supplied by the directory collaborator: the definition
/// plus the employee it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSchedule {
    pub employee_id: crate::types::EmployeeId,
    pub employee_name: String,
    #[serde(flatten)]
    pub schedule: Schedule,
}

/// The scheduled work window for one date, as absolute timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ShiftWindow {
    /// Whether this window crosses midnight: used to decide when a raw exit
    /// needs re-attribution to the previous day's shift.
    #[must_use]
    pub fn is_overnight(&self) -> bool {
        self.end.date() > self.start.date()
    }
}

/// Weekday of a date in schedule numbering (0 = Monday).
fn weekday_index(date: NaiveDate) -> u8 {
    u8::try_from(date.weekday().num_days_from_monday()).unwrap_or(0)
}

impl Schedule {
    /// Computes the scheduled work window for `date`, or `None` when the
    /// schedule defines no shift that day.
    ///
    /// Pure and per-date: callers handling overnight shifts may also need
    /// the previous day's window, because an exit after midnight anchors to
    /// the prior day's shift.
    #[must_use]
    pub fn resolve_window(&self, date: NaiveDate) -> Option<ShiftWindow> {
        let weekday = weekday_index(date);
        match self.kind {
            ScheduleKind::Regular => {
                if let Some(days) = &self.days_of_week {
                    if !days.contains(&weekday) {
                        return None;
                    }
                }
                let start_time = self.start_time?;
                let end_time = self.end_time?;
                Some(window_from_times(date, start_time, end_time))
            }
            ScheduleKind::Floating => {
                let shift = self
                    .floating_shifts
                    .iter()
                    .find(|shift| shift.weekday == weekday)?;
                Some(window_from_times(date, shift.start, shift.end))
            }
            ScheduleKind::RoundTheClock => {
                if let Some(days) = &self.days_of_week {
                    if !days.contains(&weekday) {
                        return None;
                    }
                }
                // Rotations without an explicit anchor reference 09:00.
                let anchor = self
                    .period_start
                    .unwrap_or_else(|| NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default());
                let start = date.and_time(anchor);
                Some(ShiftWindow {
                    start,
                    end: start + Duration::hours(24),
                })
            }
        }
    }

    /// Whether `date` is a working day under this schedule.
    ///
    /// Floating schedules treat every day as working for stats purposes,
    /// matching the shift table being advisory rather than exclusive.
    #[must_use]
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        match self.kind {
            ScheduleKind::Regular | ScheduleKind::RoundTheClock => self
                .days_of_week
                .as_ref()
                .is_none_or(|days| days.contains(&weekday_index(date))),
            ScheduleKind::Floating => true,
        }
    }
}

/// Combines a date with start/end times, pushing the end to the next day
/// for shifts that cross midnight.
fn window_from_times(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> ShiftWindow {
    let start_dt = date.and_time(start);
    let mut end_dt = date.and_time(end);
    if end < start {
        end_dt += Duration::days(1);
    }
    ShiftWindow {
        start: start_dt,
        end: end_dt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn regular_9_to_18() -> Schedule {
        Schedule {
            kind: ScheduleKind::Regular,
            days_of_week: Some(vec![0, 1, 2, 3, 4]),
            start_time: Some(time(9, 0)),
            end_time: Some(time(18, 0)),
            period_start: None,
            floating_shifts: Vec::new(),
            allowed_late_minutes: 10,
            allowed_early_leave_minutes: 10,
        }
    }

    #[test]
    fn regular_weekday_resolves() {
        // 2026-01-05 is a Monday.
        let window = regular_9_to_18().resolve_window(date(2026, 1, 5)).unwrap();
        assert_eq!(window.start, date(2026, 1, 5).and_time(time(9, 0)));
        assert_eq!(window.end, date(2026, 1, 5).and_time(time(18, 0)));
        assert!(!window.is_overnight());
    }

    #[test]
    fn regular_off_day_is_no_shift() {
        // 2026-01-10 is a Saturday.
        assert!(regular_9_to_18().resolve_window(date(2026, 1, 10)).is_none());
        assert!(!regular_9_to_18().is_work_day(date(2026, 1, 10)));
    }

    #[test]
    fn regular_overnight_end_pushed_to_next_day() {
        let mut schedule = regular_9_to_18();
        schedule.start_time = Some(time(22, 0));
        schedule.end_time = Some(time(6, 0));
        let window = schedule.resolve_window(date(2026, 1, 5)).unwrap();
        assert_eq!(window.start, date(2026, 1, 5).and_time(time(22, 0)));
        assert_eq!(window.end, date(2026, 1, 6).and_time(time(6, 0)));
        assert!(window.is_overnight());
    }

    #[test]
    fn regular_without_times_is_no_shift() {
        let mut schedule = regular_9_to_18();
        schedule.start_time = None;
        assert!(schedule.resolve_window(date(2026, 1, 5)).is_none());
    }

    #[test]
    fn floating_matches_weekday_entry() {
        let schedule = Schedule {
            kind: ScheduleKind::Floating,
            days_of_week: None,
            start_time: None,
            end_time: None,
            period_start: None,
            floating_shifts: vec![
                FloatingShift {
                    weekday: 0,
                    start: time(8, 0),
                    end: time(14, 0),
                },
                FloatingShift {
                    weekday: 2,
                    start: time(14, 0),
                    end: time(22, 0),
                },
            ],
            allowed_late_minutes: 0,
            allowed_early_leave_minutes: 0,
        };
        // Wednesday 2026-01-07.
        let window = schedule.resolve_window(date(2026, 1, 7)).unwrap();
        assert_eq!(window.start, date(2026, 1, 7).and_time(time(14, 0)));
        // Tuesday has no entry.
        assert!(schedule.resolve_window(date(2026, 1, 6)).is_none());
        // But floating schedules count every day as a work day.
        assert!(schedule.is_work_day(date(2026, 1, 6)));
    }

    #[test]
    fn round_the_clock_defaults_to_nine_oclock_anchor() {
        let schedule = Schedule {
            kind: ScheduleKind::RoundTheClock,
            days_of_week: None,
            start_time: None,
            end_time: None,
            period_start: None,
            floating_shifts: Vec::new(),
            allowed_late_minutes: 0,
            allowed_early_leave_minutes: 0,
        };
        let window = schedule.resolve_window(date(2026, 1, 5)).unwrap();
        assert_eq!(window.start, date(2026, 1, 5).and_time(time(9, 0)));
        assert_eq!(window.end, date(2026, 1, 6).and_time(time(9, 0)));
    }

    #[test]
    fn round_the_clock_honors_period_start_and_day_set() {
        let schedule = Schedule {
            kind: ScheduleKind::RoundTheClock,
            days_of_week: Some(vec![0, 2, 4]),
            start_time: None,
            end_time: None,
            period_start: Some(time(9, 0)),
            floating_shifts: Vec::new(),
            allowed_late_minutes: 0,
            allowed_early_leave_minutes: 0,
        };
        let window = schedule.resolve_window(date(2026, 1, 5)).unwrap();
        assert_eq!(window.start, date(2026, 1, 5).and_time(time(9, 0)));
        assert_eq!(window.end, date(2026, 1, 6).and_time(time(9, 0)));
        // Tuesday excluded by the day set.
        assert!(schedule.resolve_window(date(2026, 1, 6)).is_none());
        assert!(!schedule.is_work_day(date(2026, 1, 6)));
    }

    #[test]
    fn kind_roundtrip() {
        for kind in [
            ScheduleKind::Regular,
            ScheduleKind::Floating,
            ScheduleKind::RoundTheClock,
        ] {
            let parsed: ScheduleKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("nightly".parse::<ScheduleKind>().is_err());
    }

    #[test]
    fn schedule_deserializes_from_import_json() {
        let json = r#"{
            "kind": "regular",
            "days_of_week": [0, 1, 2, 3, 4],
            "start_time": "09:00:00",
            "end_time": "18:00:00",
            "allowed_late_minutes": 15
        }"#;
        let schedule: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.kind, ScheduleKind::Regular);
        assert_eq!(schedule.allowed_late_minutes, 15);
        assert_eq!(schedule.allowed_early_leave_minutes, 0);
        assert!(schedule.floating_shifts.is_empty());
    }
}
