//! Storage layer for the attendance engine.
//!
//! Provides persistence for raw door-camera events, schedules, sessions,
//! and attendance counters using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in site-local ISO 8601 form without a zone
//! suffix (e.g. `2026-01-05T09:00:00`). All devices report in the site's
//! wall clock, so:
//! - Lexicographic ordering matches chronological ordering
//! - SQLite's `date()` extracts the calendar day directly
//! - Values stay human-readable in the database
//!
//! ## Schedule Storage
//!
//! The `definition` column of `schedules` holds the JSON serialization of
//! [`att_core::Schedule`]. Adding fields with defaults is safe; removing or
//! renaming them requires a migration.

use std::collections::BTreeMap;
use std::path::Path;

use att_core::{
    AttendanceStats, EmployeeId, EmployeeSchedule, RawEvent, Schedule, Session, SessionStore,
    StatsDelta,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored timestamp failed to parse back.
    #[error("invalid timestamp in row {row_id}: {timestamp}")]
    TimestampParse {
        row_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored employee id failed validation.
    #[error("invalid employee id in row {row_id}: {value}")]
    EmployeeIdParse {
        row_id: String,
        value: String,
        #[source]
        source: att_core::ValidationError,
    },
    /// A stored schedule definition failed to deserialize.
    #[error("invalid schedule for employee {employee_id}: {message}")]
    InvalidSchedule {
        employee_id: String,
        message: String,
    },
    /// A raw event payload failed to serialize.
    #[error("unstorable payload for event {event_id}: {message}")]
    InvalidPayload { event_id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// One row of the lateness leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateRanking {
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub late_count: u32,
    pub early_leave_count: u32,
}

/// Row counts for the status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub events: u64,
    pub schedules: u64,
    pub sessions: u64,
    pub open_sessions: u64,
    pub orphan_exits: u64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Raw camera events, exactly as ingested. The reconciler reads
            -- these; it never mutates them.
            CREATE TABLE IF NOT EXISTS raw_events (
                id TEXT PRIMARY KEY,
                employee_id TEXT NOT NULL,
                device_label TEXT,
                network_address TEXT,
                event_time TEXT NOT NULL,
                payload TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_raw_events_time ON raw_events(event_time);
            CREATE INDEX IF NOT EXISTS idx_raw_events_employee ON raw_events(employee_id);

            -- definition: JSON schedule (kind, windows, grace periods)
            CREATE TABLE IF NOT EXISTS schedules (
                employee_id TEXT PRIMARY KEY,
                employee_name TEXT NOT NULL,
                definition TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY,
                employee_id TEXT NOT NULL,
                entry_time TEXT,
                exit_time TEXT,
                entry_device TEXT,
                exit_device TEXT,
                duration_seconds INTEGER,
                late_counted INTEGER NOT NULL DEFAULT 0,
                early_leave_counted INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_employee_entry
                ON sessions(employee_id, entry_time);
            -- One session per (employee, entry instant); replays hit this
            -- instead of duplicating.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_unique_entry
                ON sessions(employee_id, entry_time) WHERE entry_time IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_unique_orphan
                ON sessions(employee_id, exit_time) WHERE entry_time IS NULL;

            CREATE TABLE IF NOT EXISTS attendance_stats (
                employee_id TEXT PRIMARY KEY,
                late_count INTEGER NOT NULL DEFAULT 0,
                early_leave_count INTEGER NOT NULL DEFAULT 0
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of raw events, ignoring duplicates by ID.
    pub fn insert_events(&mut self, events: &[RawEvent]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR IGNORE INTO raw_events
                (id, employee_id, device_label, network_address, event_time, payload)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )?;
            for event in events {
                let payload = event
                    .payload
                    .as_ref()
                    .map(|value| {
                        serde_json::to_string(value).map_err(|err| DbError::InvalidPayload {
                            event_id: event.id.clone(),
                            message: err.to_string(),
                        })
                    })
                    .transpose()?;
                inserted += stmt.execute(params![
                    event.id,
                    event.employee_id,
                    event.device_label,
                    event.network_address,
                    format_timestamp(event.event_time),
                    payload,
                ])?;
            }
        }
        tx.commit()?;
        debug!(total = events.len(), inserted, "stored raw events");
        Ok(inserted)
    }

    /// Lists all raw events ordered by timestamp then ID.
    pub fn list_events(&self) -> Result<Vec<RawEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, employee_id, device_label, network_address, event_time, payload
            FROM raw_events
            ORDER BY event_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], row_to_raw_event)?;
        collect_events(rows)
    }

    /// Lists raw events whose timestamp falls within a date range, inclusive
    /// on both ends, ordered by timestamp then ID.
    pub fn list_events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawEvent>, DbError> {
        if end < start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, employee_id, device_label, network_address, event_time, payload
            FROM raw_events
            WHERE date(event_time) >= ? AND date(event_time) <= ?
            ORDER BY event_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([start.to_string(), end.to_string()], row_to_raw_event)?;
        collect_events(rows)
    }

    /// Inserts or replaces one employee's schedule.
    pub fn upsert_schedule(&mut self, record: &EmployeeSchedule) -> Result<(), DbError> {
        let definition =
            serde_json::to_string(&record.schedule).map_err(|err| DbError::InvalidSchedule {
                employee_id: record.employee_id.to_string(),
                message: err.to_string(),
            })?;
        self.conn.execute(
            "
            INSERT OR REPLACE INTO schedules (employee_id, employee_name, definition)
            VALUES (?, ?, ?)
            ",
            params![record.employee_id.as_str(), record.employee_name, definition],
        )?;
        Ok(())
    }

    /// Loads every schedule, keyed by employee.
    pub fn list_schedules(&self) -> Result<BTreeMap<EmployeeId, EmployeeSchedule>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT employee_id, employee_name, definition FROM schedules ORDER BY employee_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut schedules = BTreeMap::new();
        for row in rows {
            let (raw_id, employee_name, definition) = row?;
            let employee_id =
                EmployeeId::new(&raw_id).map_err(|source| DbError::EmployeeIdParse {
                    row_id: raw_id.clone(),
                    value: raw_id.clone(),
                    source,
                })?;
            let schedule: Schedule =
                serde_json::from_str(&definition).map_err(|err| DbError::InvalidSchedule {
                    employee_id: raw_id.clone(),
                    message: err.to_string(),
                })?;
            schedules.insert(
                employee_id.clone(),
                EmployeeSchedule {
                    employee_id,
                    employee_name,
                    schedule,
                },
            );
        }
        Ok(schedules)
    }

    /// Lists all sessions ordered by entry time then ID. Orphan exits sort
    /// first (null entry).
    pub fn list_sessions(&self) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, employee_id, entry_time, exit_time, entry_device, exit_device,
                   duration_seconds, late_counted, early_leave_counted
            FROM sessions
            ORDER BY entry_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], row_to_session_row)?;
        collect_sessions(rows)
    }

    /// Lists sessions whose entry date falls within a range, inclusive on
    /// both ends.
    pub fn list_sessions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Session>, DbError> {
        if end < start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, employee_id, entry_time, exit_time, entry_device, exit_device,
                   duration_seconds, late_counted, early_leave_counted
            FROM sessions
            WHERE entry_time IS NOT NULL
              AND date(entry_time) >= ? AND date(entry_time) <= ?
            ORDER BY entry_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([start.to_string(), end.to_string()], row_to_session_row)?;
        collect_sessions(rows)
    }

    /// Deletes every session. Used before a from-scratch rebuild.
    pub fn clear_sessions(&mut self) -> Result<usize, DbError> {
        let deleted = self.conn.execute("DELETE FROM sessions", [])?;
        Ok(deleted)
    }

    /// Clears counted flags on every session and zeroes every counter.
    ///
    /// Run before [`Self::apply_stats`] so a recompute starts from a clean
    /// slate instead of stacking onto stale counts.
    pub fn reset_stats(&mut self) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE sessions SET late_counted = 0, early_leave_counted = 0",
            [],
        )?;
        tx.execute("DELETE FROM attendance_stats", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Persists recomputed counters and marks the sessions they came from.
    pub fn apply_stats(&mut self, deltas: &[StatsDelta]) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        {
            let mut counter_stmt = tx.prepare(
                "
                INSERT OR REPLACE INTO attendance_stats (employee_id, late_count, early_leave_count)
                VALUES (?, ?, ?)
                ",
            )?;
            let mut late_stmt =
                tx.prepare("UPDATE sessions SET late_counted = 1 WHERE id = ?")?;
            let mut early_stmt =
                tx.prepare("UPDATE sessions SET early_leave_counted = 1 WHERE id = ?")?;
            for delta in deltas {
                counter_stmt.execute(params![
                    delta.employee_id.as_str(),
                    delta.stats.late_count,
                    delta.stats.early_leave_count,
                ])?;
                for mark in &delta.marks {
                    if let Some(id) = mark.late_session {
                        late_stmt.execute([id])?;
                    }
                    if let Some(id) = mark.early_leave_session {
                        early_stmt.execute([id])?;
                    }
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Stored counters for one employee, zero when none were recorded.
    pub fn stats_for(&self, employee: &EmployeeId) -> Result<AttendanceStats, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT late_count, early_leave_count FROM attendance_stats WHERE employee_id = ?",
                [employee.as_str()],
                |row| {
                    Ok(AttendanceStats {
                        late_count: row.get(0)?,
                        early_leave_count: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(row.unwrap_or_default())
    }

    /// The employees with the most recorded late arrivals, descending, ties
    /// broken by name.
    pub fn top_late(&self, limit: u32) -> Result<Vec<LateRanking>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT s.employee_id, sch.employee_name, s.late_count, s.early_leave_count
            FROM attendance_stats s
            JOIN schedules sch ON sch.employee_id = s.employee_id
            WHERE s.late_count > 0
            ORDER BY s.late_count DESC, sch.employee_name ASC
            LIMIT ?
            ",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?;

        let mut rankings = Vec::new();
        for row in rows {
            let (raw_id, employee_name, late_count, early_leave_count) = row?;
            let employee_id =
                EmployeeId::new(&raw_id).map_err(|source| DbError::EmployeeIdParse {
                    row_id: raw_id.clone(),
                    value: raw_id.clone(),
                    source,
                })?;
            rankings.push(LateRanking {
                employee_id,
                employee_name,
                late_count,
                early_leave_count,
            });
        }
        Ok(rankings)
    }

    /// Row counts across every table, for the status display.
    pub fn status(&self) -> Result<StatusSummary, DbError> {
        let count = |query: &str| -> Result<u64, DbError> {
            let n: i64 = self.conn.query_row(query, [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or_default())
        };
        Ok(StatusSummary {
            events: count("SELECT COUNT(*) FROM raw_events")?,
            schedules: count("SELECT COUNT(*) FROM schedules")?,
            sessions: count("SELECT COUNT(*) FROM sessions")?,
            open_sessions: count(
                "SELECT COUNT(*) FROM sessions WHERE entry_time IS NOT NULL AND exit_time IS NULL",
            )?,
            orphan_exits: count("SELECT COUNT(*) FROM sessions WHERE entry_time IS NULL")?,
        })
    }
}

impl SessionStore for Database {
    type Error = DbError;

    fn open_session(
        &mut self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Option<Session>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, employee_id, entry_time, exit_time, entry_device, exit_device,
                       duration_seconds, late_counted, early_leave_counted
                FROM sessions
                WHERE employee_id = ?
                  AND entry_time IS NOT NULL AND exit_time IS NULL
                  AND date(entry_time) = ?
                ORDER BY entry_time DESC
                LIMIT 1
                ",
                params![employee.as_str(), date.to_string()],
                row_to_session_row,
            )
            .optional()?;
        row.map(SessionRow::into_session).transpose()
    }

    fn sessions_on(
        &mut self,
        employee: &EmployeeId,
        date: NaiveDate,
    ) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, employee_id, entry_time, exit_time, entry_device, exit_device,
                   duration_seconds, late_counted, early_leave_counted
            FROM sessions
            WHERE employee_id = ? AND entry_time IS NOT NULL AND date(entry_time) = ?
            ORDER BY entry_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map(params![employee.as_str(), date.to_string()], row_to_session_row)?;
        collect_sessions(rows)
    }

    fn has_exit_at(&mut self, employee: &EmployeeId, exit: NaiveDateTime) -> Result<bool, DbError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM sessions WHERE employee_id = ? AND exit_time = ? LIMIT 1",
                params![employee.as_str(), format_timestamp(exit)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_session(&mut self, session: Session) -> Result<i64, DbError> {
        self.conn.execute(
            "
            INSERT INTO sessions
            (employee_id, entry_time, exit_time, entry_device, exit_device,
             duration_seconds, late_counted, early_leave_counted)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                session.employee_id.as_str(),
                session.entry_time.map(format_timestamp),
                session.exit_time.map(format_timestamp),
                session.entry_device,
                session.exit_device,
                session.duration_seconds,
                session.late_counted,
                session.early_leave_counted,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_session(&mut self, session: &Session) -> Result<(), DbError> {
        self.conn.execute(
            "
            UPDATE sessions
            SET entry_time = ?, exit_time = ?, entry_device = ?, exit_device = ?,
                duration_seconds = ?, late_counted = ?, early_leave_counted = ?
            WHERE id = ?
            ",
            params![
                session.entry_time.map(format_timestamp),
                session.exit_time.map(format_timestamp),
                session.entry_device,
                session.exit_device,
                session.duration_seconds,
                session.late_counted,
                session.early_leave_counted,
                session.id,
            ],
        )?;
        Ok(())
    }
}

/// An unparsed sessions row. Timestamp and id validation happen in
/// [`SessionRow::into_session`] so `rusqlite` mapping errors stay distinct
/// from domain validation errors.
struct SessionRow {
    id: i64,
    employee_id: String,
    entry_time: Option<String>,
    exit_time: Option<String>,
    entry_device: Option<String>,
    exit_device: Option<String>,
    duration_seconds: Option<i64>,
    late_counted: bool,
    early_leave_counted: bool,
}

impl SessionRow {
    fn into_session(self) -> Result<Session, DbError> {
        let row_id = self.id.to_string();
        let employee_id =
            EmployeeId::new(&self.employee_id).map_err(|source| DbError::EmployeeIdParse {
                row_id: row_id.clone(),
                value: self.employee_id.clone(),
                source,
            })?;
        Ok(Session {
            id: Some(self.id),
            employee_id,
            entry_time: self
                .entry_time
                .as_deref()
                .map(|t| parse_timestamp(t, &row_id))
                .transpose()?,
            exit_time: self
                .exit_time
                .as_deref()
                .map(|t| parse_timestamp(t, &row_id))
                .transpose()?,
            entry_device: self.entry_device,
            exit_device: self.exit_device,
            duration_seconds: self.duration_seconds,
            late_counted: self.late_counted,
            early_leave_counted: self.early_leave_counted,
        })
    }
}

fn row_to_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        employee_id: row.get(1)?,
        entry_time: row.get(2)?,
        exit_time: row.get(3)?,
        entry_device: row.get(4)?,
        exit_device: row.get(5)?,
        duration_seconds: row.get(6)?,
        late_counted: row.get(7)?,
        early_leave_counted: row.get(8)?,
    })
}

/// Raw event row, timestamps still TEXT.
type RawEventRow = (
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
);

fn row_to_raw_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEventRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn collect_events(
    rows: impl Iterator<Item = rusqlite::Result<RawEventRow>>,
) -> Result<Vec<RawEvent>, DbError> {
    let mut events = Vec::new();
    for row in rows {
        let (id, employee_id, device_label, network_address, event_time, payload) = row?;
        let event_time = parse_timestamp(&event_time, &id)?;
        let payload = payload
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|err| DbError::InvalidPayload {
                    event_id: id.clone(),
                    message: err.to_string(),
                })
            })
            .transpose()?;
        events.push(RawEvent {
            id,
            employee_id,
            device_label,
            network_address,
            event_time,
            payload,
        });
    }
    Ok(events)
}

fn collect_sessions(
    rows: impl Iterator<Item = rusqlite::Result<SessionRow>>,
) -> Result<Vec<Session>, DbError> {
    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?.into_session()?);
    }
    Ok(sessions)
}

fn parse_timestamp(timestamp: &str, row_id: &str) -> Result<NaiveDateTime, DbError> {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|source| {
        DbError::TimestampParse {
            row_id: row_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        }
    })
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
