//! Period aggregation for timesheet reports.
//!
//! Groups an employee's sessions into report periods. A period is normally
//! one calendar date, anchored to the entry; round-the-clock rotations
//! anchor a period to the qualifying morning entry and absorb the exit that
//! falls on the following day.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::deviation::match_day;
use crate::schedule::{EmployeeSchedule, ScheduleKind};
use crate::session::Session;
use crate::types::EmployeeId;

/// Aggregation knobs, externalized rather than baked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Morning window defining round-the-clock periods.
    pub morning_window_start: NaiveTime,
    pub morning_window_end: NaiveTime,
    /// Duration ceiling for regular/floating periods, in hours.
    pub max_duration_hours: i64,
    /// Duration ceiling for round-the-clock periods, in hours.
    pub max_duration_hours_round_the_clock: i64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            morning_window_start: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            morning_window_end: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            max_duration_hours: 16,
            max_duration_hours_round_the_clock: 48,
        }
    }
}

impl ReportConfig {
    fn in_morning_window(&self, at: NaiveDateTime) -> bool {
        let t = at.time();
        t >= self.morning_window_start && t <= self.morning_window_end
    }

    fn duration_cap(&self, kind: ScheduleKind) -> Duration {
        match kind {
            ScheduleKind::RoundTheClock => {
                Duration::hours(self.max_duration_hours_round_the_clock)
            }
            ScheduleKind::Regular | ScheduleKind::Floating => {
                Duration::hours(self.max_duration_hours)
            }
        }
    }
}

/// One report row: the totals for one employee over one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub period_date: NaiveDate,
    pub first_entry: NaiveDateTime,
    pub last_exit: NaiveDateTime,
    pub duration_seconds: i64,
    pub late_minutes: i64,
    pub early_leave_minutes: i64,
    pub is_extra_shift: bool,
}

/// Aggregates complete sessions into report rows, sorted by employee name
/// then period date.
///
/// Employees absent from `schedules` are excluded entirely. Incomplete
/// sessions (open or orphan) carry no duration and are ignored.
#[must_use]
pub fn aggregate(
    sessions: &[Session],
    schedules: &BTreeMap<EmployeeId, EmployeeSchedule>,
    config: &ReportConfig,
) -> Vec<ReportRow> {
    // (employee, period date) -> sessions of that period.
    let mut periods: BTreeMap<(&EmployeeId, NaiveDate), Vec<&Session>> = BTreeMap::new();
    for session in sessions {
        if !session.is_complete() {
            continue;
        }
        if !schedules.contains_key(&session.employee_id) {
            continue;
        }
        let Some(date) = session.entry_date() else {
            continue;
        };
        // Entry-anchored for every kind: an exit on the next calendar day
        // still belongs to the entry's period.
        periods
            .entry((&session.employee_id, date))
            .or_default()
            .push(session);
    }

    let mut rows = Vec::with_capacity(periods.len());
    for ((employee, period_date), group) in &periods {
        let Some(record) = schedules.get(*employee) else {
            continue;
        };
        let Some(row) = build_row(record, *period_date, group, config) else {
            continue;
        };
        rows.push(row);
    }

    rows.sort_by(|a, b| {
        (a.employee_name.as_str(), a.period_date).cmp(&(b.employee_name.as_str(), b.period_date))
    });
    rows
}

fn build_row(
    record: &EmployeeSchedule,
    period_date: NaiveDate,
    group: &[&Session],
    config: &ReportConfig,
) -> Option<ReportRow> {
    let entries: Vec<NaiveDateTime> = group.iter().filter_map(|s| s.entry_time).collect();

    let first_entry = if record.schedule.kind == ScheduleKind::RoundTheClock {
        // The qualifying morning entry defines the period; days with no
        // morning-window entry fall back to their earliest entry.
        entries
            .iter()
            .filter(|e| config.in_morning_window(**e))
            .min()
            .or_else(|| entries.iter().min())
            .copied()?
    } else {
        entries.iter().min().copied()?
    };
    let last_exit = group.iter().filter_map(|s| s.exit_time).max()?;

    let raw_duration = last_exit - first_entry;
    let duration = if raw_duration < Duration::zero() {
        Duration::zero()
    } else {
        // Cap to reject corrupted pairings that would dwarf every honest row.
        raw_duration.min(config.duration_cap(record.schedule.kind))
    };

    let deviation = match_day(&record.schedule, period_date, first_entry, Some(last_exit));

    Some(ReportRow {
        employee_id: record.employee_id.clone(),
        employee_name: record.employee_name.clone(),
        period_date,
        first_entry,
        last_exit,
        duration_seconds: duration.num_seconds(),
        late_minutes: deviation.late_minutes,
        early_leave_minutes: deviation.early_leave_minutes,
        is_extra_shift: deviation.is_extra_shift,
    })
}

/// Mean of the morning-window entry times, for display next to
/// round-the-clock rows.
///
/// Presentation only: this never feeds duration or deviation math.
#[must_use]
pub fn average_morning_entry(entries: &[NaiveDateTime], config: &ReportConfig) -> Option<NaiveTime> {
    let morning: Vec<NaiveDateTime> = entries
        .iter()
        .filter(|e| config.in_morning_window(**e))
        .copied()
        .collect();
    if morning.is_empty() {
        return None;
    }
    let total_seconds: i64 = morning
        .iter()
        .map(|e| i64::from(e.time().num_seconds_from_midnight()))
        .sum();
    let mean = total_seconds / i64::try_from(morning.len()).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(mean).ok()?, 0)
}
