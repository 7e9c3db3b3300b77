//! Visit record store.
//!
//! The engine is the only writer. A store keeps each record in exactly one
//! of four ordered collections (one per [`State`]) and an append-only event
//! log. Every write is atomic: the record change and its event land
//! together or not at all.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::model::{CustomerId, CustomerRecord, State};

pub trait VisitStore: Send {
    /// Append a new record to the end of Waiting.
    fn insert(&mut self, record: &CustomerRecord, event: EventKind, at: DateTime<Utc>)
    -> Result<Event>;

    /// Compare-and-set move. The stored record must currently be in `from`;
    /// it is replaced by `record` and appended to the end of
    /// `record.state()`'s collection. Otherwise fails with
    /// [`Error::StateConflict`](crate::error::Error::StateConflict) and
    /// writes nothing. A move that is not a legal edge of the lifecycle
    /// fails with [`Error::InvalidTransition`] before anything is read.
    fn transition(
        &mut self,
        record: &CustomerRecord,
        from: State,
        event: EventKind,
        at: DateTime<Utc>,
    ) -> Result<Event>;

    fn get(&self, id: CustomerId) -> Result<Option<CustomerRecord>>;

    /// Records in `state`, in the order they entered it.
    fn list(&self, state: State) -> Result<Vec<CustomerRecord>>;

    /// Record an event that is not tied to a record write.
    fn record_event(&mut self, kind: EventKind, at: DateTime<Utc>) -> Result<Event>;

    /// Events with `seq > since_seq`, ascending.
    fn events_since(&self, since_seq: u64) -> Result<Vec<Event>>;
}

/// Reject a move that is not an edge of the lifecycle.
fn check_edge(record: &CustomerRecord, from: State) -> Result<()> {
    let to = record.state();
    if !from.can_transition_to(to) {
        return Err(Error::InvalidTransition {
            id: record.id,
            from,
            to,
        });
    }
    Ok(())
}
