//! Queue engine. The public API for registering and moving parties.
//!
//! The engine owns the record store and the clock. All state transitions
//! go through here; every operation either fully succeeds (one atomic move
//! plus its timestamp) or fails without touching the queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use tracing::{info, warn};

use crate::board::{Board, QueueStats};
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result, ValidationError};
use crate::event::{Event, EventKind};
use crate::export::ActivityLog;
use crate::model::*;
use crate::storage::{MemoryStore, SqliteStore, VisitStore};
use crate::telemetry::metrics;
use crate::telemetry::queue::{record_customer, record_state_transition, start_operation_span};

/// Country calling code every mobile number must start with, unless
/// configured otherwise.
pub const DEFAULT_MOBILE_PREFIX: &str = "+971";

/// Required-prefix rule for mobile numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobilePolicy {
    required_prefix: String,
}

impl MobilePolicy {
    pub fn new(required_prefix: impl Into<String>) -> Self {
        Self {
            required_prefix: required_prefix.into(),
        }
    }

    pub fn check(&self, mobile_number: &str) -> std::result::Result<(), ValidationError> {
        if mobile_number.is_empty() {
            return Err(ValidationError::MissingMobileNumber);
        }
        if !mobile_number.starts_with(&self.required_prefix) {
            return Err(ValidationError::MobilePrefix {
                required: self.required_prefix.clone(),
            });
        }
        Ok(())
    }
}

impl Default for MobilePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MOBILE_PREFIX)
    }
}

/// The queue engine. Owns all state and enforces all invariants.
pub struct Engine {
    store: Box<dyn VisitStore>,
    clock: Arc<dyn Clock>,
    policy: MobilePolicy,
}

impl Engine {
    /// Create an engine over an arbitrary store, with the wall clock and
    /// the default mobile policy.
    pub fn new(store: impl VisitStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            clock: Arc::new(SystemClock),
            policy: MobilePolicy::default(),
        }
    }

    /// Create an engine with in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Create an engine backed by a SQLite file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(SqliteStore::open(path)?))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: MobilePolicy) -> Self {
        self.policy = policy;
        self
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Add a party to the end of Waiting.
    ///
    /// Name and mobile number are trimmed first. A rejection leaves the
    /// queue untouched and is recorded as a `RegistrationRejected` event.
    pub fn register(&mut self, new: NewCustomer) -> Result<CustomerRecord> {
        let span = start_operation_span("register", None);
        let _entered = span.enter();

        let name = new.name().trim().to_string();
        let mobile_number = new.mobile_number().trim().to_string();

        if let Err(rejection) = self.validate(&name, new.party_size(), &mobile_number) {
            warn!(reason = %rejection, "registration rejected");
            metrics::registrations_rejected()
                .add(1, &[KeyValue::new("reason", rejection_label(&rejection))]);
            // The caller gets the rejection even if the audit write fails.
            if let Err(e) = self.store.record_event(
                EventKind::RegistrationRejected {
                    reason: rejection.to_string(),
                },
                self.clock.now(),
            ) {
                warn!(error = %e, "cannot record rejected registration");
            }
            return Err(rejection.into());
        }

        let now = self.clock.now();
        let record = CustomerRecord {
            id: CustomerId::new(),
            name,
            party_size: new.party_size(),
            mobile_number,
            arrival_time: now,
            table_number: None,
            seated_time: None,
            finished_time: None,
            canceled_time: None,
        };
        record_customer(&span, record.id);

        self.store.insert(
            &record,
            EventKind::CustomerRegistered {
                id: record.id,
                name: record.name.clone(),
                party_size: record.party_size,
            },
            now,
        )?;

        metrics::customers_registered().add(1, &[]);
        info!(id = %record.id, party_size = record.party_size, "customer registered");
        Ok(record)
    }

    /// Waiting -> Canceled.
    pub fn cancel(&mut self, id: CustomerId) -> Result<CustomerRecord> {
        let span = start_operation_span("cancel", Some(id));
        let _entered = span.enter();

        let current = self.require(id, State::Waiting)?;
        let now = not_before(self.clock.now(), current.arrival_time);

        let mut record = current;
        record.canceled_time = Some(now);
        let wait_minutes = record.current_wait_minutes(now);

        self.store.transition(
            &record,
            State::Waiting,
            EventKind::CustomerCanceled { id, wait_minutes },
            now,
        )?;

        self.after_transition(&span, State::Waiting, State::Canceled);
        info!(%id, wait_minutes, "customer canceled");
        Ok(record)
    }

    /// Waiting -> Seated at `table_number`.
    pub fn seat(&mut self, id: CustomerId, table_number: u32) -> Result<CustomerRecord> {
        let span = start_operation_span("seat", Some(id));
        let _entered = span.enter();

        if table_number == 0 {
            return Err(ValidationError::InvalidTableNumber(table_number).into());
        }

        let current = self.require(id, State::Waiting)?;
        let now = not_before(self.clock.now(), current.arrival_time);

        let mut record = current;
        record.table_number = Some(table_number);
        record.seated_time = Some(now);
        let wait_minutes = record.current_wait_minutes(now);

        self.store.transition(
            &record,
            State::Waiting,
            EventKind::CustomerSeated {
                id,
                table_number,
                wait_minutes,
            },
            now,
        )?;

        self.after_transition(&span, State::Waiting, State::Seated);
        metrics::wait_minutes().record(wait_minutes as f64, &[]);
        info!(%id, table_number, wait_minutes, "customer seated");
        Ok(record)
    }

    /// Seated -> Finished.
    pub fn finish(&mut self, id: CustomerId) -> Result<CustomerRecord> {
        let span = start_operation_span("finish", Some(id));
        let _entered = span.enter();

        let current = self.require(id, State::Seated)?;
        let seated_time = current.seated_time.unwrap_or(current.arrival_time);
        let now = not_before(self.clock.now(), seated_time);

        let mut record = current;
        record.finished_time = Some(now);
        let seated_minutes = record.seated_duration_minutes().unwrap_or(0);

        self.store.transition(
            &record,
            State::Seated,
            EventKind::CustomerFinished { id, seated_minutes },
            now,
        )?;

        self.after_transition(&span, State::Seated, State::Finished);
        metrics::seated_minutes().record(seated_minutes as f64, &[]);
        info!(%id, seated_minutes, "customer finished");
        Ok(record)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Get a record by ID, in whatever state it is.
    pub fn get(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        self.store.get(id)
    }

    /// List records in one state, in the order they entered it.
    pub fn list_by_state(&self, state: State) -> Result<Vec<CustomerRecord>> {
        self.store.list(state)
    }

    pub fn waiting(&self) -> Result<Vec<CustomerRecord>> {
        self.store.list(State::Waiting)
    }

    pub fn seated(&self) -> Result<Vec<CustomerRecord>> {
        self.store.list(State::Seated)
    }

    pub fn finished(&self) -> Result<Vec<CustomerRecord>> {
        self.store.list(State::Finished)
    }

    pub fn canceled(&self) -> Result<Vec<CustomerRecord>> {
        self.store.list(State::Canceled)
    }

    /// Whoever is at Waiting position 0 right now.
    pub fn next_to_seat(&self) -> Result<Option<CustomerRecord>> {
        Ok(self.waiting()?.into_iter().next())
    }

    /// 0-based position in Waiting, or `None` if not waiting.
    pub fn position(&self, id: CustomerId) -> Result<Option<usize>> {
        Ok(self.waiting()?.iter().position(|r| r.id == id))
    }

    /// Minutes since arrival for a Waiting or Seated record.
    pub fn current_wait_minutes(&self, record: &CustomerRecord) -> i64 {
        record.current_wait_minutes(self.clock.now())
    }

    /// Read projection of all four collections at the current time.
    pub fn board(&self) -> Result<Board> {
        Ok(Board::build(
            self.clock.now(),
            self.waiting()?,
            self.seated()?,
            self.finished()?,
            self.canceled()?,
        ))
    }

    pub fn stats(&self) -> Result<QueueStats> {
        Ok(self.board()?.stats())
    }

    /// One row per record: all Waiting, then Seated, Finished, Canceled.
    pub fn export_log(&self) -> Result<ActivityLog> {
        let mut records = Vec::new();
        for state in State::ALL {
            records.extend(self.store.list(state)?);
        }
        Ok(ActivityLog::from_records(&records))
    }

    /// Get events since a sequence number.
    pub fn events_since(&self, since_seq: u64) -> Result<Vec<Event>> {
        self.store.events_since(since_seq)
    }

    /// Append an event that does not move a record (e.g. a notice outcome).
    pub(crate) fn record_event(&mut self, kind: EventKind) -> Result<Event> {
        let now = self.clock.now();
        self.store.record_event(kind, now)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn validate(
        &self,
        name: &str,
        party_size: u32,
        mobile_number: &str,
    ) -> std::result::Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if party_size < 1 {
            return Err(ValidationError::InvalidPartySize(party_size));
        }
        self.policy.check(mobile_number)
    }

    /// Fetch a record that must currently be in `expected`.
    fn require(&self, id: CustomerId, expected: State) -> Result<CustomerRecord> {
        match self.store.get(id)? {
            Some(record) if record.state() == expected => Ok(record),
            other => {
                let actual = other.map(|r| r.state());
                warn!(%id, %expected, actual = ?actual, "operation on record in wrong state");
                Err(Error::StateConflict {
                    id,
                    expected,
                    actual,
                })
            }
        }
    }

    fn after_transition(&self, span: &tracing::Span, from: State, to: State) {
        record_state_transition(span, from, to);
        metrics::state_transitions().add(
            1,
            &[
                KeyValue::new("from", from.as_str()),
                KeyValue::new("to", to.as_str()),
            ],
        );
    }
}

/// Stamp time, raised to `floor` if the clock reads earlier.
fn not_before(now: DateTime<Utc>, floor: DateTime<Utc>) -> DateTime<Utc> {
    now.max(floor)
}

fn rejection_label(rejection: &ValidationError) -> &'static str {
    match rejection {
        ValidationError::EmptyName => "empty_name",
        ValidationError::InvalidPartySize(_) => "party_size",
        ValidationError::MissingMobileNumber => "missing_mobile",
        ValidationError::MobilePrefix { .. } => "mobile_prefix",
        ValidationError::InvalidTableNumber(_) => "table_number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_distinguishes_missing_from_wrong_prefix() {
        let policy = MobilePolicy::default();
        assert_eq!(policy.check(""), Err(ValidationError::MissingMobileNumber));
        assert_eq!(
            policy.check("0501234567"),
            Err(ValidationError::MobilePrefix {
                required: "+971".to_string()
            })
        );
        assert!(policy.check("+971501234567").is_ok());
    }

    #[test]
    fn custom_prefix_is_honored() {
        let policy = MobilePolicy::new("+44");
        assert!(policy.check("+447700900123").is_ok());
        assert!(policy.check("+971501234567").is_err());
    }

    #[test]
    fn stamps_never_precede_floor() {
        let floor = Utc::now();
        let earlier = floor - chrono::Duration::seconds(30);
        assert_eq!(not_before(earlier, floor), floor);
        assert_eq!(not_before(floor, earlier), floor);
    }

    /// Memory store whose audit log refuses standalone events.
    struct NoAuditStore(MemoryStore);

    impl VisitStore for NoAuditStore {
        fn insert(
            &mut self,
            record: &CustomerRecord,
            event: EventKind,
            at: DateTime<Utc>,
        ) -> Result<Event> {
            self.0.insert(record, event, at)
        }

        fn transition(
            &mut self,
            record: &CustomerRecord,
            from: State,
            event: EventKind,
            at: DateTime<Utc>,
        ) -> Result<Event> {
            self.0.transition(record, from, event, at)
        }

        fn get(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
            self.0.get(id)
        }

        fn list(&self, state: State) -> Result<Vec<CustomerRecord>> {
            self.0.list(state)
        }

        fn record_event(&mut self, _kind: EventKind, _at: DateTime<Utc>) -> Result<Event> {
            Err(Error::Other("database is locked".to_string()))
        }

        fn events_since(&self, since_seq: u64) -> Result<Vec<Event>> {
            self.0.events_since(since_seq)
        }
    }

    #[test]
    fn rejection_survives_failed_audit_write() {
        let mut engine = Engine::new(NoAuditStore(MemoryStore::new()));

        let err = engine
            .register(NewCustomer::new("Sam", 2, "0501234567"))
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Validation(ValidationError::MobilePrefix { .. })
        ));
        assert!(engine.waiting().unwrap().is_empty());
    }
}
