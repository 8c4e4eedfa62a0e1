//! Attendance statistics as a derived projection.
//!
//! The late/early-leave counters are never authoritative on their own:
//! each qualifying occurrence flags the session that produced it
//! (`late_counted` / `early_leave_counted`), and the stored counters are a
//! cache recomputable from those flags at any time. A recompute clears the
//! flags and counters for the affected range first, then replays, so
//! repeated passes never compound.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::deviation::match_day;
use crate::schedule::{Schedule, ScheduleKind};
use crate::session::Session;
use crate::types::EmployeeId;

/// Running per-employee deviation counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceStats {
    pub late_count: u32,
    pub early_leave_count: u32,
}

/// Sessions to flag after scoring one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMarks {
    /// Session carrying the day's first entry, to flag as late-counted.
    pub late_session: Option<i64>,
    /// Session carrying the day's last exit, to flag as early-leave-counted.
    pub early_leave_session: Option<i64>,
}

/// Scores one day's sessions, honoring already-set counted flags.
///
/// `sessions` are one employee's sessions whose entry falls on `date`.
/// A session already flagged from an earlier pass is authoritative: the
/// day yields no new mark for that deviation.
#[must_use]
pub fn day_marks(schedule: &Schedule, date: NaiveDate, sessions: &[Session]) -> DayMarks {
    let mut marks = DayMarks {
        late_session: None,
        early_leave_session: None,
    };

    if !schedule.is_work_day(date) {
        return marks;
    }

    let mut ordered: Vec<&Session> = sessions
        .iter()
        .filter(|s| s.entry_date() == Some(date))
        .collect();
    ordered.sort_by_key(|s| s.entry_time);
    let Some(first) = ordered.first() else {
        return marks;
    };
    let Some(first_entry) = first.entry_time else {
        return marks;
    };

    let last_exit_session = ordered
        .iter()
        .filter(|s| s.exit_time.is_some())
        .max_by_key(|s| s.exit_time);
    let last_exit = last_exit_session.and_then(|s| s.exit_time);

    let deviation = match_day(schedule, date, first_entry, last_exit);

    let already_late = ordered.iter().any(|s| s.late_counted);
    if deviation.is_late && !already_late {
        marks.late_session = first.id;
    }

    let already_early = ordered.iter().any(|s| s.early_leave_counted);
    if deviation.is_early_leave && schedule.kind != ScheduleKind::RoundTheClock && !already_early {
        marks.early_leave_session = last_exit_session.and_then(|s| s.id);
    }

    marks
}

/// One employee's recomputed deltas: counters plus the sessions to flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsDelta {
    pub employee_id: EmployeeId,
    pub stats: AttendanceStats,
    pub marks: Vec<DayMarks>,
}

/// Replays day groups into fresh counters for every employee.
///
/// Pure computation, fanned out per employee; the caller clears previous
/// flags/counters for the range and applies the returned deltas serially.
/// Employees missing from `schedules` are skipped, not errors.
#[must_use]
pub fn compute_stats(
    sessions: &[Session],
    schedules: &BTreeMap<EmployeeId, Schedule>,
) -> Vec<StatsDelta> {
    let mut by_employee: BTreeMap<&EmployeeId, Vec<&Session>> = BTreeMap::new();
    for session in sessions {
        by_employee
            .entry(&session.employee_id)
            .or_default()
            .push(session);
    }

    let mut deltas: Vec<StatsDelta> = by_employee
        .par_iter()
        .filter_map(|(employee, sessions)| {
            let schedule = schedules.get(*employee)?;
            Some(compute_employee(employee, schedule, sessions))
        })
        .collect();
    deltas.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
    deltas
}

fn compute_employee(
    employee: &EmployeeId,
    schedule: &Schedule,
    sessions: &[&Session],
) -> StatsDelta {
    let mut by_date: BTreeMap<NaiveDate, Vec<Session>> = BTreeMap::new();
    for session in sessions {
        if let Some(date) = session.entry_date() {
            by_date.entry(date).or_default().push((*session).clone());
        }
    }

    let mut stats = AttendanceStats::default();
    let mut marks = Vec::new();
    for (date, day_sessions) in &by_date {
        let day = day_marks(schedule, *date, day_sessions);
        if day.late_session.is_some() {
            stats.late_count += 1;
        }
        if day.early_leave_session.is_some() {
            stats.early_leave_count += 1;
        }
        if day.late_session.is_some() || day.early_leave_session.is_some() {
            marks.push(day);
        }
    }

    tracing::debug!(
        employee = %employee,
        late = stats.late_count,
        early_leave = stats.early_leave_count,
        "recomputed attendance stats"
    );

    StatsDelta {
        employee_id: employee.clone(),
        stats,
        marks,
    }
}
