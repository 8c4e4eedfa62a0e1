//! Core domain logic for attendance reconciliation.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: mapping raw door-camera events to entry or exit
//! - Reconciliation: pairing events into work sessions
//! - Schedules: resolving the expected shift window for a date
//! - Deviations and reports: lateness, early leaves, period totals

pub mod classify;
pub mod deviation;
pub mod event;
pub mod reconcile;
pub mod report;
pub mod schedule;
pub mod session;
pub mod stats;
pub mod types;

pub use classify::{ClassifierConfig, DeviceSignature, Direction, classify};
pub use deviation::{DayDeviation, match_day};
pub use event::RawEvent;
pub use reconcile::{MemoryStore, Outcome, RebuildStats, SessionStore, apply_event, rebuild};
pub use report::{ReportConfig, ReportRow, aggregate, average_morning_entry};
pub use schedule::{EmployeeSchedule, FloatingShift, Schedule, ScheduleKind, ShiftWindow};
pub use session::{PairingBounds, Session};
pub use stats::{AttendanceStats, DayMarks, StatsDelta, compute_stats};
pub use types::{EmployeeId, ValidationError};
