//! Recompute late/early-leave counters from sessions.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use att_core::{EmployeeId, Schedule, compute_stats};
use att_db::Database;

/// Clears every counter and counted flag, then replays all sessions into
/// fresh counts. Safe to run at any time; the result depends only on the
/// stored sessions and schedules.
pub fn run(db: &mut Database) -> Result<()> {
    let schedules: BTreeMap<EmployeeId, Schedule> = db
        .list_schedules()
        .context("failed to load schedules")?
        .into_iter()
        .map(|(id, record)| (id, record.schedule))
        .collect();

    db.reset_stats().context("failed to reset counters")?;
    let sessions = db.list_sessions().context("failed to load sessions")?;

    let deltas = compute_stats(&sessions, &schedules);
    db.apply_stats(&deltas).context("failed to store counters")?;

    let late: u32 = deltas.iter().map(|d| d.stats.late_count).sum();
    let early: u32 = deltas.iter().map(|d| d.stats.early_leave_count).sum();
    println!(
        "Recomputed counters for {} employee(s): {late} late arrival(s), {early} early leave(s)",
        deltas.len()
    );

    Ok(())
}
