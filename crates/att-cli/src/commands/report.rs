//! Timesheet report for a date range.

use std::io::Write;

use anyhow::{Context, Result};
use att_core::aggregate;
use att_db::Database;
use chrono::NaiveDate;

use crate::Config;

/// Aggregates sessions in the range into one row per employee per period
/// and writes a table (or JSON) to `writer`.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    from: NaiveDate,
    to: NaiveDate,
    json: bool,
) -> Result<()> {
    let sessions = db
        .list_sessions_in_range(from, to)
        .context("failed to load sessions")?;
    let schedules = db.list_schedules().context("failed to load schedules")?;
    let rows = aggregate(&sessions, &schedules, &config.report);

    if json {
        serde_json::to_writer_pretty(&mut *writer, &rows).context("failed to encode report")?;
        writeln!(writer)?;
        return Ok(());
    }

    if rows.is_empty() {
        writeln!(writer, "No sessions between {from} and {to}.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<20} {:<12} {:>8} {:>8} {:>6} {:>6}  {}",
        "Employee", "Date", "Entry", "Exit", "Hours", "Late", "Notes"
    )?;
    for row in &rows {
        let mut notes = Vec::new();
        if row.is_extra_shift {
            notes.push("extra shift");
        }
        if row.early_leave_minutes > 0 {
            notes.push("early leave");
        }
        writeln!(
            writer,
            "{:<20} {:<12} {:>8} {:>8} {:>6} {:>6}  {}",
            row.employee_name,
            row.period_date.to_string(),
            row.first_entry.format("%H:%M").to_string(),
            row.last_exit.format("%H:%M").to_string(),
            format_hours(row.duration_seconds),
            if row.late_minutes > 0 {
                format!("{}m", row.late_minutes)
            } else {
                "-".to_string()
            },
            notes.join(", "),
        )?;
    }

    Ok(())
}

fn format_hours(seconds: i64) -> String {
    let minutes = seconds / 60;
    format!("{}h{:02}m", minutes / 60, minutes % 60)
}
