//! Reconciled work sessions.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::EmployeeId;

/// One reconciled entry/exit pair, or an orphan half of one.
///
/// Invariant: per employee, at most one session with a null exit may exist
/// per calendar day of its entry. A session may hold only an exit (no
/// matching entry was found) or only an entry (not yet exited).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Storage-assigned identifier; `None` until persisted.
    #[serde(default)]
    pub id: Option<i64>,
    pub employee_id: EmployeeId,
    pub entry_time: Option<NaiveDateTime>,
    pub exit_time: Option<NaiveDateTime>,
    pub entry_device: Option<String>,
    pub exit_device: Option<String>,
    /// Exit minus entry, in whole seconds. Set when the pair closes.
    pub duration_seconds: Option<i64>,
    /// Guards against double-counting a late arrival across recomputes.
    #[serde(default)]
    pub late_counted: bool,
    /// Guards against double-counting an early leave across recomputes.
    #[serde(default)]
    pub early_leave_counted: bool,
}

impl Session {
    /// A freshly opened session with only an entry.
    #[must_use]
    pub fn open(employee_id: EmployeeId, entry: NaiveDateTime, device: Option<String>) -> Self {
        Self {
            id: None,
            employee_id,
            entry_time: Some(entry),
            exit_time: None,
            entry_device: device,
            exit_device: None,
            duration_seconds: None,
            late_counted: false,
            early_leave_counted: false,
        }
    }

    /// An exit with no plausible preceding entry.
    #[must_use]
    pub fn orphan_exit(employee_id: EmployeeId, exit: NaiveDateTime, device: Option<String>) -> Self {
        Self {
            id: None,
            employee_id,
            entry_time: None,
            exit_time: Some(exit),
            entry_device: None,
            exit_device: device,
            duration_seconds: None,
            late_counted: false,
            early_leave_counted: false,
        }
    }

    /// Open means an entry is waiting for its exit.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.entry_time.is_some() && self.exit_time.is_none()
    }

    /// Both halves present.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.entry_time.is_some() && self.exit_time.is_some()
    }

    /// Calendar date of the entry, when present.
    #[must_use]
    pub fn entry_date(&self) -> Option<NaiveDate> {
        self.entry_time.map(|t| t.date())
    }

    /// Attaches the exit half and derives the duration.
    pub fn close(&mut self, exit: NaiveDateTime, device: Option<String>) {
        self.exit_time = Some(exit);
        self.exit_device = device;
        self.duration_seconds = self
            .entry_time
            .map(|entry| (exit - entry).num_seconds());
    }
}

/// Plausibility bounds for pairing an exit with an open entry.
///
/// Hardware retriggers and missed punches are common; without a bound a
/// stale open entry from days earlier would silently absorb an unrelated
/// exit. `min`/`max` bound same-day closes, `overnight_*` bound closes
/// against the previous day's open entry. All values in minutes so the
/// struct can be loaded from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingBounds {
    pub min_minutes: i64,
    pub max_minutes: i64,
    pub overnight_min_minutes: i64,
    pub overnight_max_minutes: i64,
}

impl PairingBounds {
    /// Profile for the live single-event path: 30 minutes to 24 hours,
    /// wide enough to admit legitimate long and night shifts.
    #[must_use]
    pub const fn incremental() -> Self {
        Self {
            min_minutes: 30,
            max_minutes: 24 * 60,
            overnight_min_minutes: 30,
            overnight_max_minutes: 24 * 60,
        }
    }

    /// Profile for bulk rebuild: next-day matching tightens to 4-16 hours
    /// to avoid false pairings when replaying dense historical streams.
    #[must_use]
    pub const fn rebuild() -> Self {
        Self {
            min_minutes: 30,
            max_minutes: 24 * 60,
            overnight_min_minutes: 4 * 60,
            overnight_max_minutes: 16 * 60,
        }
    }

    #[must_use]
    pub fn plausible_same_day(&self, duration: Duration) -> bool {
        duration >= Duration::minutes(self.min_minutes)
            && duration <= Duration::minutes(self.max_minutes)
    }

    #[must_use]
    pub fn plausible_overnight(&self, duration: Duration) -> bool {
        duration >= Duration::minutes(self.overnight_min_minutes)
            && duration <= Duration::minutes(self.overnight_max_minutes)
    }
}

impl Default for PairingBounds {
    fn default() -> Self {
        Self::incremental()
    }
}
