//! Read projection of the queue for a presentation layer.
//!
//! A board is a snapshot: it holds no authoritative state and is rebuilt
//! after every operation. Wait times are computed against the `now` the
//! board was built at.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::CustomerRecord;

#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub generated_at: DateTime<Utc>,
    pub waiting: Vec<WaitingEntry>,
    pub seated: Vec<SeatedEntry>,
    pub finished: Vec<FinishedEntry>,
    pub canceled: Vec<CustomerRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitingEntry {
    /// 0-based. Position 0 is next to be seated.
    pub position: usize,
    pub wait_minutes: i64,
    pub record: CustomerRecord,
}

impl WaitingEntry {
    pub fn is_next(&self) -> bool {
        self.position == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatedEntry {
    /// Minutes since arrival, not since seating.
    pub wait_minutes: i64,
    pub record: CustomerRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishedEntry {
    /// `None` is shown as "N/A".
    pub seated_minutes: Option<i64>,
    pub record: CustomerRecord,
}

impl Board {
    pub(crate) fn build(
        now: DateTime<Utc>,
        waiting: Vec<CustomerRecord>,
        seated: Vec<CustomerRecord>,
        finished: Vec<CustomerRecord>,
        canceled: Vec<CustomerRecord>,
    ) -> Self {
        Self {
            generated_at: now,
            waiting: waiting
                .into_iter()
                .enumerate()
                .map(|(position, record)| WaitingEntry {
                    position,
                    wait_minutes: record.current_wait_minutes(now),
                    record,
                })
                .collect(),
            seated: seated
                .into_iter()
                .map(|record| SeatedEntry {
                    wait_minutes: record.current_wait_minutes(now),
                    record,
                })
                .collect(),
            finished: finished
                .into_iter()
                .map(|record| FinishedEntry {
                    seated_minutes: record.seated_duration_minutes(),
                    record,
                })
                .collect(),
            canceled,
        }
    }

    pub fn next_to_seat(&self) -> Option<&WaitingEntry> {
        self.waiting.first()
    }

    pub fn stats(&self) -> QueueStats {
        let waits: Vec<i64> = self.waiting.iter().map(|e| e.wait_minutes).collect();
        let durations: Vec<i64> = self
            .finished
            .iter()
            .filter_map(|e| e.seated_minutes)
            .collect();

        QueueStats {
            waiting: self.waiting.len(),
            seated: self.seated.len(),
            finished: self.finished.len(),
            canceled: self.canceled.len(),
            average_wait_minutes: average(&waits),
            longest_wait_minutes: waits.iter().max().copied(),
            average_seated_minutes: average(&durations),
        }
    }
}

/// Queue summary, computed from a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub seated: usize,
    pub finished: usize,
    pub canceled: usize,
    /// Over parties still waiting. `None` when nobody is waiting.
    pub average_wait_minutes: Option<i64>,
    pub longest_wait_minutes: Option<i64>,
    /// Over finished parties.
    pub average_seated_minutes: Option<i64>,
}

fn average(values: &[i64]) -> Option<i64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<i64>() / values.len() as i64)
    }
}
