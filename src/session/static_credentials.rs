//! Single operator credential pair held in configuration.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use super::{Session, SessionProvider};
use crate::error::{Error, Result};

pub struct StaticSessionProvider {
    email: String,
    password: SecretString,
    ttl: Duration,
    current: Mutex<Option<Session>>,
}

impl StaticSessionProvider {
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
            ttl: Duration::hours(12),
            current: Mutex::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn check_session(&self) -> Result<Option<Session>> {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|s| s.is_expired(Utc::now())) {
            info!("operator session expired");
            *slot = None;
        }
        Ok(slot.clone())
    }

    async fn login(&self, email: &str, password: &SecretString) -> Result<Session> {
        let matches = email.eq_ignore_ascii_case(&self.email)
            && password.expose_secret() == self.password.expose_secret();
        if !matches {
            warn!(email, "login rejected");
            return Err(Error::Session("invalid login credentials".to_string()));
        }

        let session = Session {
            user_id: self.email.clone(),
            email: self.email.clone(),
            access_token: SecretString::from(Uuid::new_v4().to_string()),
            expires_at: Some(Utc::now() + self.ttl),
        };
        *self.slot() = Some(session.clone());
        info!(email = %session.email, "operator logged in");
        Ok(session)
    }

    async fn logout(&self) -> Result<()> {
        if self.slot().take().is_some() {
            info!("operator logged out");
        }
        Ok(())
    }
}
