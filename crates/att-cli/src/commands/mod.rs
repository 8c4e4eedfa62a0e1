//! CLI subcommand implementations.

pub mod import_schedules;
pub mod ingest;
pub mod rebuild;
pub mod recompute_stats;
pub mod report;
pub mod status;
pub mod top_late;
