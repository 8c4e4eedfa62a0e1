//! Status command for showing stored row counts.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use att_db::Database;

pub fn run<W: Write>(writer: &mut W, db: &Database, database_path: &Path) -> Result<()> {
    let status = db.status().context("failed to count rows")?;

    writeln!(writer, "Attendance engine status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Events: {}", status.events)?;
    writeln!(writer, "Schedules: {}", status.schedules)?;
    writeln!(
        writer,
        "Sessions: {} ({} open, {} orphan exit(s))",
        status.sessions, status.open_sessions, status.orphan_exits
    )?;

    Ok(())
}
