//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Attendance reconciliation engine.
///
/// Turns raw door-camera entry/exit events into work sessions, scores them
/// against schedules, and produces timesheet reports.
#[derive(Debug, Parser)]
#[command(name = "att", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Store raw camera events and reconcile them into sessions.
    Ingest {
        /// JSON file holding an array of raw events.
        file: PathBuf,
    },

    /// Load or replace employee schedules.
    ImportSchedules {
        /// JSON file holding an array of schedule records.
        file: PathBuf,
    },

    /// Replay stored events into sessions under the bulk pairing bounds.
    Rebuild {
        /// First date to replay (inclusive). Defaults to the earliest event.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date to replay (inclusive). Defaults to the latest event.
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Delete all existing sessions first.
        #[arg(long)]
        reset: bool,
    },

    /// Recompute late/early-leave counters from sessions.
    RecomputeStats,

    /// Print the timesheet report for a date range.
    Report {
        /// First period date (inclusive).
        #[arg(long)]
        from: NaiveDate,

        /// Last period date (inclusive).
        #[arg(long)]
        to: NaiveDate,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List employees with the most late arrivals.
    TopLate {
        /// Maximum number of employees to show.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Show row counts and the database location.
    Status,
}
