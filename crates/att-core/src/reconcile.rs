//! Session reconciliation: pairing classified events into sessions.
//!
//! One pairing algorithm serves both the live incremental path (one event
//! per call, on the ingesting request's context) and the bulk rebuild path
//! (an ordered historical stream). The two differ only in the
//! [`PairingBounds`] profile they pass; there is no second copy of the
//! rules to drift.
//!
//! Replays are idempotent: an event whose effect is already present in the
//! store is a no-op, so a rebuild can run repeatedly - or concurrently with
//! live ingestion - without duplicating or drifting sessions.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::classify::{ClassifierConfig, Direction, classify};
use crate::event::RawEvent;
use crate::session::{PairingBounds, Session};
use crate::types::EmployeeId;

/// Persistence seam for the reconciler.
///
/// Implemented by the SQLite layer in production and by [`MemoryStore`]
/// for tests. All queries are scoped to one employee, matching the
/// engine's invariants: nothing ever spans employees.
pub trait SessionStore {
    type Error: std::error::Error;

    /// Latest open session (null exit, non-null entry) whose entry falls on
    /// `date`, by entry time descending.
    fn open_session(
        &mut self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<Session>, Self::Error>;

    /// All sessions whose entry falls on `date`.
    fn sessions_on(
        &mut self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<Session>, Self::Error>;

    /// Whether any session (orphans included) closed at exactly `exit`.
    fn has_exit_at(
        &mut self,
        employee: &EmployeeId,
        exit: NaiveDateTime,
    ) -> Result<bool, Self::Error>;

    /// Persists a new session, returning its assigned id.
    fn insert_session(&mut self, session: Session) -> Result<i64, Self::Error>;

    /// Rewrites a previously persisted session (`session.id` is set).
    fn update_session(&mut self, session: &Session) -> Result<(), Self::Error>;
}

/// What applying one event did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new open session was created.
    Opened,
    /// An open session's entry was advanced forward (camera retrigger).
    Advanced,
    /// An open session was closed by this exit.
    Closed,
    /// No open session qualified; an orphan-exit session was recorded.
    OrphanExit,
    /// The event's effect was already present; nothing changed.
    Superseded,
}

/// Applies one classified event to the store under the shared pairing rules.
///
/// # Entry at time T
///
/// A session that day with an entry at or after T, or a closed session
/// absorbing T, means the event was already accounted for. Otherwise an
/// open session with an earlier entry is advanced to T, else a new session
/// opens.
///
/// # Exit at time T
///
/// A session already closed at exactly T is a no-op. Otherwise the open
/// session for T's date is closed when T is strictly after its entry and
/// the duration is plausible; failing that, the previous day's open session
/// (overnight shift) under the overnight bounds. When nothing qualifies the
/// exit is recorded as an orphan.
pub fn apply_event<S: SessionStore>(
    store: &mut S,
    employee: &EmployeeId,
    direction: Direction,
    at: NaiveDateTime,
    device: Option<&str>,
    bounds: &PairingBounds,
) -> Result<Outcome, S::Error> {
    match direction {
        Direction::Entry => apply_entry(store, employee, at, device),
        Direction::Exit => apply_exit(store, employee, at, device, bounds),
    }
}

fn apply_entry<S: SessionStore>(
    store: &mut S,
    employee: &EmployeeId,
    at: NaiveDateTime,
    device: Option<&str>,
) -> Result<Outcome, S::Error> {
    let date = at.date();

    for session in store.sessions_on(employee, date)? {
        let Some(entry) = session.entry_time else {
            continue;
        };
        if entry >= at {
            // A later (or identical) entry already superseded this one.
            return Ok(Outcome::Superseded);
        }
        if session.exit_time.is_some_and(|exit| at <= exit) {
            // The instant falls inside an already closed session.
            return Ok(Outcome::Superseded);
        }
    }

    if let Some(mut open) = store.open_session(employee, date)? {
        // Retrigger: the camera fired again after the stored entry.
        open.entry_time = Some(at);
        open.entry_device = device.map(String::from);
        store.update_session(&open)?;
        tracing::debug!(employee = %employee, %at, "advanced open session entry");
        return Ok(Outcome::Advanced);
    }

    store.insert_session(Session::open(
        employee.clone(),
        at,
        device.map(String::from),
    ))?;
    tracing::debug!(employee = %employee, %at, "opened session");
    Ok(Outcome::Opened)
}

fn apply_exit<S: SessionStore>(
    store: &mut S,
    employee: &EmployeeId,
    at: NaiveDateTime,
    device: Option<&str>,
    bounds: &PairingBounds,
) -> Result<Outcome, S::Error> {
    if store.has_exit_at(employee, at)? {
        return Ok(Outcome::Superseded);
    }

    let date = at.date();

    // Same-day close first, then the overnight case against yesterday.
    if let Some(mut open) = store.open_session(employee, date)? {
        if let Some(entry) = open.entry_time {
            if at > entry && bounds.plausible_same_day(at - entry) {
                open.close(at, device.map(String::from));
                store.update_session(&open)?;
                tracing::debug!(employee = %employee, %at, "closed session");
                return Ok(Outcome::Closed);
            }
            tracing::warn!(
                employee = %employee,
                %entry,
                exit = %at,
                "exit rejected for open session, duration outside bounds"
            );
        }
    }

    if let Some(mut open) = store.open_session(employee, date - Duration::days(1))? {
        if let Some(entry) = open.entry_time {
            if at > entry && bounds.plausible_overnight(at - entry) {
                open.close(at, device.map(String::from));
                store.update_session(&open)?;
                tracing::debug!(employee = %employee, %at, "closed overnight session");
                return Ok(Outcome::Closed);
            }
        }
    }

    store.insert_session(Session::orphan_exit(
        employee.clone(),
        at,
        device.map(String::from),
    ))?;
    tracing::debug!(employee = %employee, %at, "recorded orphan exit");
    Ok(Outcome::OrphanExit)
}

/// Counters summarizing one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub processed: usize,
    pub opened: usize,
    pub advanced: usize,
    pub closed: usize,
    pub orphan_exits: usize,
    pub superseded: usize,
    pub unclassified: usize,
    pub skipped: usize,
}

impl RebuildStats {
    fn record(&mut self, outcome: Outcome) {
        self.processed += 1;
        match outcome {
            Outcome::Opened => self.opened += 1,
            Outcome::Advanced => self.advanced += 1,
            Outcome::Closed => self.closed += 1,
            Outcome::OrphanExit => self.orphan_exits += 1,
            Outcome::Superseded => self.superseded += 1,
        }
    }
}

/// Replays an event stream through [`apply_event`] in timestamp order.
///
/// Unclassifiable events, invalid employee ids, and per-event store errors
/// are logged and skipped; one bad record never aborts the batch. Safe to
/// re-run over the same range: a second pass yields identical sessions.
pub fn rebuild<S: SessionStore>(
    store: &mut S,
    events: &[RawEvent],
    classifier: &ClassifierConfig,
    bounds: &PairingBounds,
) -> RebuildStats {
    let mut ordered: Vec<&RawEvent> = events.iter().collect();
    ordered.sort_by_key(|e| (e.event_time, e.id.clone()));

    let mut stats = RebuildStats::default();
    for event in ordered {
        let Some(direction) = classify(event, classifier) else {
            stats.unclassified += 1;
            continue;
        };
        let employee = match EmployeeId::new(&event.employee_id) {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(event_id = %event.id, %error, "skipping event with invalid employee id");
                stats.skipped += 1;
                continue;
            }
        };
        match apply_event(
            store,
            &employee,
            direction,
            event.event_time,
            event.device_label.as_deref(),
            bounds,
        ) {
            Ok(outcome) => stats.record(outcome),
            Err(error) => {
                tracing::warn!(event_id = %event.id, %error, "skipping event after store error");
                stats.skipped += 1;
            }
        }
    }
    stats
}

/// In-memory session store for tests and pure replay.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Vec<Session>,
    next_id: i64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions, ordered by id.
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }
}

impl SessionStore for MemoryStore {
    type Error = std::convert::Infallible;

    fn open_session(
        &mut self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<Session>, Self::Error> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| {
                s.employee_id == *employee && s.is_open() && s.entry_date() == Some(date)
            })
            .max_by_key(|s| s.entry_time)
            .cloned())
    }

    fn sessions_on(
        &mut self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<Session>, Self::Error> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.employee_id == *employee && s.entry_date() == Some(date))
            .cloned()
            .collect())
    }

    fn has_exit_at(
        &mut self,
        employee: &EmployeeId,
        exit: NaiveDateTime,
    ) -> Result<bool, Self::Error> {
        Ok(self
            .sessions
            .iter()
            .any(|s| s.employee_id == *employee && s.exit_time == Some(exit)))
    }

    fn insert_session(&mut self, mut session: Session) -> Result<i64, Self::Error> {
        self.next_id += 1;
        session.id = Some(self.next_id);
        self.sessions.push(session);
        Ok(self.next_id)
    }

    fn update_session(&mut self, session: &Session) -> Result<(), Self::Error> {
        if let Some(slot) = self.sessions.iter_mut().find(|s| s.id == session.id) {
            *slot = session.clone();
        }
        Ok(())
    }
}
