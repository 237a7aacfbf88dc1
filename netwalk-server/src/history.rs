//! SQLite-backed trace history, ported from
//! `original_source/backend/history.py`'s `HistoryDB`: every trace,
//! reverse-compare or failure-sim request is recorded so operators can
//! revisit past results; the table is capped at [`MAX_HISTORY_ROWS`].

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

const MAX_HISTORY_ROWS: i64 = 1000;

/// One saved trace/compare/simulate invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Unique record id (a UUIDv4 string).
    pub id: String,
    /// When the query ran.
    pub timestamp: DateTime<Utc>,
    /// `"trace"`, `"compare"`, `"simulate"`, or `"blast_radius"`.
    pub query_type: String,
    /// Source device, if applicable to this query type.
    pub source: Option<String>,
    /// Destination device, if applicable.
    pub destination: Option<String>,
    /// Prefix traced, if applicable.
    pub prefix: Option<String>,
    /// The full result, serialized as JSON.
    pub result_json: String,
    /// How long the query took.
    pub query_time_ms: Option<f64>,
}

/// Summary row returned by [`HistoryStore::list`] — everything but the
/// (potentially large) `result_json` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecordSummary {
    /// Unique record id.
    pub id: String,
    /// When the query ran.
    pub timestamp: DateTime<Utc>,
    /// Query type.
    pub query_type: String,
    /// Source device, if applicable.
    pub source: Option<String>,
    /// Destination device, if applicable.
    pub destination: Option<String>,
    /// Prefix traced, if applicable.
    pub prefix: Option<String>,
    /// How long the query took.
    pub query_time_ms: Option<f64>,
}

/// Errors raised by the history store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// A SQLite-backed, mutex-serialized store for trace history.
///
/// One [`Connection`] guarded by a [`Mutex`]; history writes are off the
/// trace hot path (§5), so lock contention here never affects an in-flight
/// trace.
pub struct HistoryStore {
    conn: Mutex<Connection>,
}

impl HistoryStore {
    /// Open (creating if necessary) the history database at `path` and
    /// ensure its schema and WAL pragmas are set.
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS trace_history (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                query_type TEXT NOT NULL,
                source TEXT,
                destination TEXT,
                prefix TEXT,
                result_json TEXT NOT NULL,
                query_time_ms REAL
            )",
            [],
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory store, for tests.
    #[cfg(test)]
    fn open_in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS trace_history (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                query_type TEXT NOT NULL,
                source TEXT,
                destination TEXT,
                prefix TEXT,
                result_json TEXT NOT NULL,
                query_time_ms REAL
            )",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Insert `record`, then trim the table down to [`MAX_HISTORY_ROWS`]
    /// rows, oldest first.
    pub fn save(&self, record: &TraceRecord) -> Result<(), HistoryError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO trace_history
                (id, timestamp, query_type, source, destination, prefix, result_json, query_time_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.timestamp.to_rfc3339(),
                record.query_type,
                record.source,
                record.destination,
                record.prefix,
                record.result_json,
                record.query_time_ms,
            ],
        )?;
        conn.execute(
            "DELETE FROM trace_history
             WHERE id IN (
                 SELECT id FROM trace_history
                 ORDER BY timestamp ASC
                 LIMIT MAX(0, (SELECT COUNT(*) FROM trace_history) - ?1)
             )",
            params![MAX_HISTORY_ROWS],
        )?;
        Ok(())
    }

    /// List the most recent `limit` records (clamped to `[1, 500]`),
    /// optionally filtered by `query_type`.
    pub fn list(&self, limit: i64, query_type: Option<&str>) -> Result<Vec<TraceRecordSummary>, HistoryError> {
        let safe_limit = limit.clamp(1, 500);
        let conn = self.conn.lock().unwrap();

        let row_to_summary = |row: &rusqlite::Row| -> rusqlite::Result<TraceRecordSummary> {
            Ok(TraceRecordSummary {
                id: row.get(0)?,
                timestamp: row.get::<_, String>(1)?.parse().unwrap_or_else(|_| Utc::now()),
                query_type: row.get(2)?,
                source: row.get(3)?,
                destination: row.get(4)?,
                prefix: row.get(5)?,
                query_time_ms: row.get(6)?,
            })
        };

        let mut rows = Vec::new();
        if let Some(qt) = query_type {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, query_type, source, destination, prefix, query_time_ms
                 FROM trace_history WHERE query_type = ?1 ORDER BY timestamp DESC LIMIT ?2",
            )?;
            let mapped = stmt.query_map(params![qt, safe_limit], row_to_summary)?;
            for row in mapped {
                rows.push(row?);
            }
        } else {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, query_type, source, destination, prefix, query_time_ms
                 FROM trace_history ORDER BY timestamp DESC LIMIT ?1",
            )?;
            let mapped = stmt.query_map(params![safe_limit], row_to_summary)?;
            for row in mapped {
                rows.push(row?);
            }
        }

        Ok(rows)
    }

    /// Fetch one record's full payload by id.
    pub fn get(&self, id: &str) -> Result<Option<TraceRecord>, HistoryError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, query_type, source, destination, prefix, result_json, query_time_ms
             FROM trace_history WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], |row| {
            Ok(TraceRecord {
                id: row.get(0)?,
                timestamp: row.get::<_, String>(1)?.parse().unwrap_or_else(|_| Utc::now()),
                query_type: row.get(2)?,
                source: row.get(3)?,
                destination: row.get(4)?,
                prefix: row.get(5)?,
                result_json: row.get(6)?,
                query_time_ms: row.get(7)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Delete one record by id. Returns `true` if a row was removed.
    pub fn delete(&self, id: &str) -> Result<bool, HistoryError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM trace_history WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    /// Delete every record. Returns the number removed.
    pub fn clear(&self) -> Result<usize, HistoryError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM trace_history", [])?;
        Ok(affected)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(id: &str) -> TraceRecord {
        TraceRecord {
            id: id.to_string(),
            timestamp: Utc::now(),
            query_type: "trace".to_string(),
            source: Some("A".to_string()),
            destination: None,
            prefix: Some("10.0.0.0/24".to_string()),
            result_json: "{}".to_string(),
            query_time_ms: Some(12.5),
        }
    }

    #[test]
    fn save_and_get_round_trips() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.save(&record("r1")).unwrap();
        let fetched = store.get("r1").unwrap().unwrap();
        assert_eq!(fetched.prefix.as_deref(), Some("10.0.0.0/24"));
    }

    #[test]
    fn list_respects_query_type_filter() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.save(&record("r1")).unwrap();
        let mut r2 = record("r2");
        r2.query_type = "compare".to_string();
        store.save(&r2).unwrap();

        let traces = store.list(50, Some("trace")).unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].id, "r1");
    }

    #[test]
    fn delete_removes_a_single_record() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.save(&record("r1")).unwrap();
        assert!(store.delete("r1").unwrap());
        assert!(store.get("r1").unwrap().is_none());
    }

    #[test]
    fn clear_removes_everything() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.save(&record("r1")).unwrap();
        store.save(&record("r2")).unwrap();
        assert_eq!(store.clear().unwrap(), 2);
    }
}
