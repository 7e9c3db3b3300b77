//! In-memory store. Lost on drop; used by tests and single-session desks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{VisitStore, check_edge};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::model::{CustomerId, CustomerRecord, State};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<CustomerId, CustomerRecord>,
    waiting: Vec<CustomerId>,
    seated: Vec<CustomerId>,
    finished: Vec<CustomerId>,
    canceled: Vec<CustomerId>,
    events: Vec<Event>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lane(&self, state: State) -> &Vec<CustomerId> {
        match state {
            State::Waiting => &self.waiting,
            State::Seated => &self.seated,
            State::Finished => &self.finished,
            State::Canceled => &self.canceled,
        }
    }

    fn lane_mut(&mut self, state: State) -> &mut Vec<CustomerId> {
        match state {
            State::Waiting => &mut self.waiting,
            State::Seated => &mut self.seated,
            State::Finished => &mut self.finished,
            State::Canceled => &mut self.canceled,
        }
    }

    fn push_event(&mut self, kind: EventKind, at: DateTime<Utc>) -> Event {
        let event = Event {
            seq: self.events.len() as u64 + 1,
            timestamp: at,
            kind,
        };
        self.events.push(event.clone());
        event
    }
}

impl VisitStore for MemoryStore {
    fn insert(
        &mut self,
        record: &CustomerRecord,
        event: EventKind,
        at: DateTime<Utc>,
    ) -> Result<Event> {
        if self.records.contains_key(&record.id) {
            return Err(Error::Other(format!("duplicate customer id {}", record.id)));
        }
        self.records.insert(record.id, record.clone());
        self.waiting.push(record.id);
        Ok(self.push_event(event, at))
    }

    fn transition(
        &mut self,
        record: &CustomerRecord,
        from: State,
        event: EventKind,
        at: DateTime<Utc>,
    ) -> Result<Event> {
        check_edge(record, from)?;

        let actual = self.records.get(&record.id).map(CustomerRecord::state);
        let index = self.lane(from).iter().position(|id| *id == record.id);

        let (Some(index), Some(actual)) = (index, actual) else {
            return Err(Error::StateConflict {
                id: record.id,
                expected: from,
                actual,
            });
        };
        if actual != from {
            return Err(Error::StateConflict {
                id: record.id,
                expected: from,
                actual: Some(actual),
            });
        }

        self.lane_mut(from).remove(index);
        self.lane_mut(record.state()).push(record.id);
        self.records.insert(record.id, record.clone());
        Ok(self.push_event(event, at))
    }

    fn get(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        Ok(self.records.get(&id).cloned())
    }

    fn list(&self, state: State) -> Result<Vec<CustomerRecord>> {
        Ok(self
            .lane(state)
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect())
    }

    fn record_event(&mut self, kind: EventKind, at: DateTime<Utc>) -> Result<Event> {
        Ok(self.push_event(kind, at))
    }

    fn events_since(&self, since_seq: u64) -> Result<Vec<Event>> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.seq > since_seq)
            .cloned()
            .collect())
    }
}
