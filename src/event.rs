//! Structured events emitted by the engine on every queue change.
//!
//! Consumers read the event stream to build dashboards or audit logs.
//! The exported activity log is built from records; events also capture
//! what never reaches a record, such as rejected registrations and
//! notification outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::CustomerId;

/// A structured event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    CustomerRegistered {
        id: CustomerId,
        name: String,
        party_size: u32,
    },
    RegistrationRejected {
        reason: String,
    },
    CustomerSeated {
        id: CustomerId,
        table_number: u32,
        wait_minutes: i64,
    },
    CustomerFinished {
        id: CustomerId,
        seated_minutes: i64,
    },
    CustomerCanceled {
        id: CustomerId,
        wait_minutes: i64,
    },
    NoticeSent {
        id: CustomerId,
        provider_id: String,
    },
    NoticeFailed {
        id: CustomerId,
        error: String,
    },
    /// Payload this version does not recognize.
    #[serde(skip)]
    Unknown {
        raw: String,
    },
}

impl EventKind {
    /// The customer this event concerns, if any.
    pub fn customer_id(&self) -> Option<CustomerId> {
        match self {
            EventKind::CustomerRegistered { id, .. }
            | EventKind::CustomerSeated { id, .. }
            | EventKind::CustomerFinished { id, .. }
            | EventKind::CustomerCanceled { id, .. }
            | EventKind::NoticeSent { id, .. }
            | EventKind::NoticeFailed { id, .. } => Some(*id),
            EventKind::RegistrationRejected { .. } | EventKind::Unknown { .. } => None,
        }
    }

    /// Decode a stored payload, falling back to `Unknown` rather than failing.
    pub fn decode(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|_| EventKind::Unknown {
            raw: raw.to_string(),
        })
    }
}
