//! Operator sessions.
//!
//! The queue is only reachable while a session is active. This module is
//! the whole of the auth contract: check, log in, log out.

mod static_credentials;
mod supabase;

pub use static_credentials::StaticSessionProvider;
pub use supabase::SupabaseSessionProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::error::Result;

/// An authenticated operator.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub access_token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current session, or `None` if logged out or expired.
    async fn check_session(&self) -> Result<Option<Session>>;

    async fn login(&self, email: &str, password: &SecretString) -> Result<Session>;

    async fn logout(&self) -> Result<()>;
}
