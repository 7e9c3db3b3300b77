//! SQLite storage layer.
//!
//! Durable backing for the visit record store. WAL mode for concurrent
//! readers. Several processes may share one file: every write runs in an
//! IMMEDIATE transaction and transitions are guarded by the source state,
//! so at most one of two racing moves on the same record succeeds.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::{VisitStore, check_edge};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::model::*;

const CUSTOMER_COLUMNS: &str = "id, name, party_size, mobile_number, arrival_time, \
     table_number, seated_time, finished_time, canceled_time";

/// Storage backend. Owns the SQLite connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&mut self) -> Result<()> {
        // Writers from other processes wait instead of failing fast.
        self.conn.busy_timeout(std::time::Duration::from_secs(5))?;
        // WAL mode for concurrent readers
        self.conn
            .query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS customers (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                party_size      INTEGER NOT NULL,
                mobile_number   TEXT NOT NULL,
                arrival_time    TEXT NOT NULL,
                table_number    INTEGER,
                seated_time     TEXT,
                finished_time   TEXT,
                canceled_time   TEXT,
                state           TEXT NOT NULL DEFAULT 'waiting',
                position        INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_lane ON customers(state, position);

            CREATE TABLE IF NOT EXISTS events (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                kind        TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Execute a closure within an IMMEDIATE transaction.
    ///
    /// The transaction commits if the closure returns Ok, rolls back on Err.
    fn with_transaction<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

impl VisitStore for SqliteStore {
    fn insert(
        &mut self,
        record: &CustomerRecord,
        event: EventKind,
        at: DateTime<Utc>,
    ) -> Result<Event> {
        self.with_transaction(|tx| {
            let position = next_position_on(tx)?;
            tx.execute(
                "INSERT INTO customers (
                    id, name, party_size, mobile_number, arrival_time,
                    table_number, seated_time, finished_time, canceled_time,
                    state, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.0.to_string(),
                    record.name,
                    record.party_size,
                    record.mobile_number,
                    record.arrival_time.to_rfc3339(),
                    record.table_number,
                    record.seated_time.map(|t| t.to_rfc3339()),
                    record.finished_time.map(|t| t.to_rfc3339()),
                    record.canceled_time.map(|t| t.to_rfc3339()),
                    record.state().as_str(),
                    position,
                ],
            )?;
            record_event_on(tx, event, at)
        })
    }

    fn transition(
        &mut self,
        record: &CustomerRecord,
        from: State,
        event: EventKind,
        at: DateTime<Utc>,
    ) -> Result<Event> {
        check_edge(record, from)?;

        self.with_transaction(|tx| {
            let position = next_position_on(tx)?;
            let changed = tx.execute(
                "UPDATE customers SET
                    table_number = ?1, seated_time = ?2, finished_time = ?3,
                    canceled_time = ?4, state = ?5, position = ?6
                 WHERE id = ?7 AND state = ?8",
                params![
                    record.table_number,
                    record.seated_time.map(|t| t.to_rfc3339()),
                    record.finished_time.map(|t| t.to_rfc3339()),
                    record.canceled_time.map(|t| t.to_rfc3339()),
                    record.state().as_str(),
                    position,
                    record.id.0.to_string(),
                    from.as_str(),
                ],
            )?;

            if changed == 0 {
                return Err(Error::StateConflict {
                    id: record.id,
                    expected: from,
                    actual: get_state_on(tx, record.id)?,
                });
            }

            record_event_on(tx, event, at)
        })
    }

    fn get(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id.0.to_string()], |row| {
                Ok(row_to_customer(row))
            })
            .optional()?
            .transpose()
    }

    fn list(&self, state: State) -> Result<Vec<CustomerRecord>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE state = ?1 ORDER BY position ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params![state.as_str()], |row| Ok(row_to_customer(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().collect()
    }

    fn record_event(&mut self, kind: EventKind, at: DateTime<Utc>) -> Result<Event> {
        record_event_on(&self.conn, kind, at)
    }

    fn events_since(&self, since_seq: u64) -> Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT seq, timestamp, kind FROM events WHERE seq > ?1 ORDER BY seq ASC")?;

        let events = stmt
            .query_map(params![since_seq as i64], |row| {
                let kind_str: String = row.get(2)?;
                Ok(Event {
                    seq: row.get::<_, i64>(0)? as u64,
                    timestamp: row
                        .get::<_, String>(1)?
                        .parse()
                        .unwrap_or_else(|_| Utc::now()),
                    kind: EventKind::decode(&kind_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// Inner functions. Accept &Connection so they work with both
// Connection (auto-commit) and Transaction (deref to Connection).
// ---------------------------------------------------------------------------

fn next_position_on(conn: &Connection) -> Result<i64> {
    let position: i64 =
        conn.query_row("SELECT COALESCE(MAX(position), 0) + 1 FROM customers", [], |row| {
            row.get(0)
        })?;
    Ok(position)
}

fn get_state_on(conn: &Connection, id: CustomerId) -> Result<Option<State>> {
    let state_str: Option<String> = conn
        .query_row(
            "SELECT state FROM customers WHERE id = ?1",
            params![id.0.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    state_str
        .map(|s| s.parse().map_err(Error::Other))
        .transpose()
}

fn record_event_on(conn: &Connection, kind: EventKind, at: DateTime<Utc>) -> Result<Event> {
    let payload = serde_json::to_string(&kind)
        .map_err(|e| Error::Other(format!("cannot encode event: {e}")))?;

    conn.execute(
        "INSERT INTO events (timestamp, kind) VALUES (?1, ?2)",
        params![at.to_rfc3339(), payload],
    )?;

    let seq = conn.last_insert_rowid();

    Ok(Event {
        seq: seq as u64,
        timestamp: at,
        kind,
    })
}

// ---------------------------------------------------------------------------
// Row parsing helpers
// ---------------------------------------------------------------------------

fn row_to_customer(row: &rusqlite::Row) -> Result<CustomerRecord> {
    let id_str: String = row.get(0)?;

    Ok(CustomerRecord {
        id: id_str
            .parse()
            .map_err(|e: uuid::Error| Error::Other(format!("bad customer id {id_str}: {e}")))?,
        name: row.get(1)?,
        party_size: row.get(2)?,
        mobile_number: row.get(3)?,
        arrival_time: parse_time(&row.get::<_, String>(4)?)?,
        table_number: row.get(5)?,
        seated_time: parse_optional_time(row.get(6)?)?,
        finished_time: parse_optional_time(row.get(7)?)?,
        canceled_time: parse_optional_time(row.get(8)?)?,
    })
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    s.parse()
        .map_err(|e| Error::Other(format!("invalid timestamp {s}: {e}")))
}

fn parse_optional_time(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_time).transpose()
}
