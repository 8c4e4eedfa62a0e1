//! Ingest raw camera events and reconcile them into sessions.

use std::path::Path;

use anyhow::{Context, Result};
use att_core::{RawEvent, rebuild};
use att_db::Database;

use crate::Config;

/// Reads a JSON array of raw events, stores them, then applies each through
/// the shared pairing rules under the live (incremental) bounds.
pub fn run(db: &mut Database, config: &Config, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let events: Vec<RawEvent> =
        serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", file.display()))?;

    let stored = db.insert_events(&events).context("failed to store events")?;
    let stats = rebuild(db, &events, &config.classifier, &config.pairing);

    println!(
        "Stored {stored} new event(s); {} opened, {} closed, {} advanced, {} orphan exit(s)",
        stats.opened, stats.closed, stats.advanced, stats.orphan_exits
    );
    if stats.unclassified > 0 {
        println!("{} event(s) could not be classified", stats.unclassified);
    }
    if stats.skipped > 0 {
        println!("{} event(s) skipped (see log)", stats.skipped);
    }

    Ok(())
}
