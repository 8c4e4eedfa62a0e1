//! Lateness leaderboard.

use std::io::Write;

use anyhow::{Context, Result};
use att_db::Database;

/// Writes the employees with the most recorded late arrivals.
///
/// Reads the stored counters; run `recompute-stats` first if sessions have
/// changed since the last recompute.
pub fn run<W: Write>(writer: &mut W, db: &Database, limit: u32) -> Result<()> {
    let rankings = db.top_late(limit).context("failed to load counters")?;

    if rankings.is_empty() {
        writeln!(writer, "No late arrivals recorded.")?;
        return Ok(());
    }

    for (position, ranking) in rankings.iter().enumerate() {
        writeln!(
            writer,
            "{}. {} ({}): {} late, {} early leave(s)",
            position + 1,
            ranking.employee_name,
            ranking.employee_id,
            ranking.late_count,
            ranking.early_leave_count,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use att_core::{
        AttendanceStats, EmployeeId, EmployeeSchedule, Schedule, ScheduleKind, StatsDelta,
    };

    fn schedule(id: &str, name: &str) -> EmployeeSchedule {
        EmployeeSchedule {
            employee_id: EmployeeId::new(id).unwrap(),
            employee_name: name.to_string(),
            schedule: Schedule {
                kind: ScheduleKind::Regular,
                days_of_week: Some(vec![0, 1, 2, 3, 4]),
                start_time: None,
                end_time: None,
                period_start: None,
                floating_shifts: Vec::new(),
                allowed_late_minutes: 0,
                allowed_early_leave_minutes: 0,
            },
        }
    }

    #[test]
    fn leaderboard_is_ordered_and_limited() {
        let mut db = Database::open_in_memory().unwrap();
        db.upsert_schedule(&schedule("7", "Aigerim")).unwrap();
        db.upsert_schedule(&schedule("8", "Bolat")).unwrap();
        db.upsert_schedule(&schedule("9", "Zarina")).unwrap();
        let delta = |id: &str, late: u32| StatsDelta {
            employee_id: EmployeeId::new(id).unwrap(),
            stats: AttendanceStats {
                late_count: late,
                early_leave_count: 0,
            },
            marks: Vec::new(),
        };
        db.apply_stats(&[delta("7", 1), delta("8", 5), delta("9", 3)])
            .unwrap();

        let mut output = Vec::new();
        run(&mut output, &db, 2).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("1. Bolat"));
        assert!(output.contains("2. Zarina"));
        assert!(!output.contains("Aigerim"));
    }

    #[test]
    fn empty_leaderboard_says_so() {
        let db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, 10).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("No late arrivals"));
    }
}
