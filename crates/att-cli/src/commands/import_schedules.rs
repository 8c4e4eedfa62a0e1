//! Load or replace employee schedules.

use std::path::Path;

use anyhow::{Context, Result};
use att_core::EmployeeSchedule;
use att_db::Database;

/// Reads a JSON array of schedule records and upserts each one.
pub fn run(db: &mut Database, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let records: Vec<EmployeeSchedule> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", file.display()))?;

    for record in &records {
        db.upsert_schedule(record)
            .with_context(|| format!("failed to store schedule for {}", record.employee_id))?;
    }

    println!("Imported {} schedule(s)", records.len());
    Ok(())
}
