//! Replay stored events into sessions.

use anyhow::{Context, Result};
use att_core::{PairingBounds, rebuild};
use att_db::Database;
use chrono::NaiveDate;

use crate::Config;

/// Replays stored events through the shared pairing rules under the bulk
/// bounds, optionally restricted to a date range or from a clean slate.
///
/// Without `--reset` the replay is idempotent: events whose effect is
/// already present leave the sessions untouched.
pub fn run(
    db: &mut Database,
    config: &Config,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    reset: bool,
) -> Result<()> {
    if reset {
        let deleted = db.clear_sessions().context("failed to clear sessions")?;
        println!("Deleted {deleted} existing session(s)");
    }

    let events = if from.is_none() && to.is_none() {
        db.list_events()
    } else {
        // Stored timestamps are four-digit years, so these bounds cover
        // everything without tripping SQLite's text comparison.
        let start = from.unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default());
        let end = to.unwrap_or_else(|| NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or_default());
        db.list_events_in_range(start, end)
    }
    .context("failed to load events")?;

    if events.is_empty() {
        println!("No events to replay.");
        return Ok(());
    }

    let stats = rebuild(db, &events, &config.classifier, &PairingBounds::rebuild());
    println!(
        "Replayed {} event(s): {} opened, {} closed, {} advanced, {} orphan exit(s), {} already applied",
        stats.processed, stats.opened, stats.closed, stats.advanced, stats.orphan_exits, stats.superseded
    );
    if stats.unclassified > 0 {
        println!("{} event(s) could not be classified", stats.unclassified);
    }

    Ok(())
}
