//! Core data model.
//!
//! A customer record is one registered party. It has identity, contact
//! details, and a set of lifecycle timestamps. The lifecycle state is not
//! stored separately: it is whichever terminal timestamp has been stamped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Customer Record
// ---------------------------------------------------------------------------

/// A party tracked by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Unique identifier, assigned at registration.
    pub id: CustomerId,

    /// Display name. Never empty.
    pub name: String,

    /// Number of guests. At least 1.
    pub party_size: u32,

    /// Contact number. Starts with the configured required prefix.
    pub mobile_number: String,

    pub arrival_time: DateTime<Utc>,

    /// Set exactly once, on Waiting -> Seated.
    pub table_number: Option<u32>,
    pub seated_time: Option<DateTime<Utc>>,

    /// Set exactly once, on Seated -> Finished.
    pub finished_time: Option<DateTime<Utc>>,

    /// Set exactly once, on Waiting -> Canceled.
    pub canceled_time: Option<DateTime<Utc>>,
}

impl CustomerRecord {
    /// Lifecycle state, derived from which timestamps are set.
    pub fn state(&self) -> State {
        if self.canceled_time.is_some() {
            State::Canceled
        } else if self.finished_time.is_some() {
            State::Finished
        } else if self.seated_time.is_some() {
            State::Seated
        } else {
            State::Waiting
        }
    }

    /// Whole minutes since arrival. Derived on demand, never stored.
    ///
    /// A clock that reads earlier than `arrival_time` yields 0.
    pub fn current_wait_minutes(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.arrival_time)
            .num_minutes()
            .max(0)
    }

    /// Whole minutes between seating and finishing.
    ///
    /// `None` ("not applicable") unless both timestamps are present.
    pub fn seated_duration_minutes(&self) -> Option<i64> {
        match (self.seated_time, self.finished_time) {
            (Some(seated), Some(finished)) => {
                Some(finished.signed_duration_since(seated).num_minutes())
            }
            _ => None,
        }
    }

    /// `tel:` URI for dialing the party from a phone-capable front end.
    pub fn dial_uri(&self) -> String {
        format!("tel:{}", self.mobile_number)
    }
}

/// Newtype for customer IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::str::FromStr for CustomerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(CustomerId)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a customer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Registered, in line. The only initial state.
    Waiting,
    /// At a table. Can only move on to Finished.
    Seated,
    /// Left after being seated. Terminal.
    Finished,
    /// Left the line before being seated. Terminal.
    Canceled,
}

impl State {
    /// All states, in export order.
    pub const ALL: [State; 4] = [
        State::Waiting,
        State::Seated,
        State::Finished,
        State::Canceled,
    ];

    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: State) -> bool {
        use State::*;
        matches!(
            (self, to),
            (Waiting, Seated) | (Waiting, Canceled) | (Seated, Finished)
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(self) -> bool {
        matches!(self, State::Finished | State::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Waiting => "waiting",
            State::Seated => "seated",
            State::Finished => "finished",
            State::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "waiting" => Ok(State::Waiting),
            "seated" => Ok(State::Seated),
            "finished" => Ok(State::Finished),
            "canceled" | "cancelled" => Ok(State::Canceled),
            other => Err(format!("unknown state: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Registration input. The engine's public API for adding a party.
///
/// Fields are validated by the engine, not here, so that a front end can
/// build one straight from a form and surface the specific rejection.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    name: String,
    party_size: u32,
    mobile_number: String,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, party_size: u32, mobile_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            party_size,
            mobile_number: mobile_number.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    pub fn mobile_number(&self) -> &str {
        &self.mobile_number
    }
}
