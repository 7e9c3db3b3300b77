//! Error types for waitlist.

use thiserror::Error;

use crate::model::{CustomerId, State};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("customer {id} is not {expected} ({})", describe_actual(.actual))]
    StateConflict {
        id: CustomerId,
        expected: State,
        actual: Option<State>,
    },

    #[error("customer {id}: invalid state transition: {from} -> {to}")]
    InvalidTransition {
        id: CustomerId,
        from: State,
        to: State,
    },

    #[error("no active session")]
    Unauthenticated,

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Rejected registration or seating input. No state was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("name is required")]
    EmptyName,

    #[error("party size must be at least 1, got {0}")]
    InvalidPartySize(u32),

    #[error("mobile number is required")]
    MissingMobileNumber,

    #[error("mobile number must start with {required}")]
    MobilePrefix { required: String },

    #[error("table number must be a positive integer, got {0}")]
    InvalidTableNumber(u32),
}

impl Error {
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Error::StateConflict { .. } | Error::InvalidTransition { .. }
        )
    }

    /// Failures of the messaging or session capability. Queue state is
    /// never affected by these.
    pub fn is_external(&self) -> bool {
        matches!(self, Error::Messaging(_) | Error::Session(_))
    }
}

fn describe_actual(actual: &Option<State>) -> String {
    match actual {
        Some(state) => format!("currently {state}"),
        None => "unknown id".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
