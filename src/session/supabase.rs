//! Supabase (GoTrue) password sign-in.
//!
//! Sessions are cached in-process; `check_session` never calls out.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use super::{Session, SessionProvider};
use crate::error::{Error, Result};

pub struct SupabaseSessionProvider {
    client: reqwest::Client,
    url: String,
    anon_key: SecretString,
    current: Mutex<Option<Session>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// GoTrue has used both shapes over time.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl SupabaseSessionProvider {
    pub fn new(url: impl Into<String>, anon_key: SecretString, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Session(format!("cannot build http client: {e}")))?;
        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            anon_key,
            current: Mutex::new(None),
        })
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionProvider for SupabaseSessionProvider {
    async fn check_session(&self) -> Result<Option<Session>> {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|s| s.is_expired(Utc::now())) {
            *slot = None;
        }
        Ok(slot.clone())
    }

    async fn login(&self, email: &str, password: &SecretString) -> Result<Session> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.url))
            .query(&[("grant_type", "password")])
            .header("apikey", self.anon_key.expose_secret())
            .json(&serde_json::json!({
                "email": email,
                "password": password.expose_secret(),
            }))
            .send()
            .await
            .map_err(|e| Error::Session(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Session(format!("cannot read response: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|e| e.error_description.or(e.msg).or(e.error))
                .unwrap_or(text);
            warn!(email, %status, "login rejected");
            return Err(Error::Session(format!("login failed: {detail}")));
        }

        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Session(format!("unexpected response: {e}")))?;

        let session = Session {
            user_id: token.user.id,
            email: token.user.email.unwrap_or_else(|| email.to_string()),
            access_token: SecretString::from(token.access_token),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        };
        *self.slot() = Some(session.clone());
        info!(user_id = %session.user_id, "operator logged in");
        Ok(session)
    }

    async fn logout(&self) -> Result<()> {
        let Some(session) = self.slot().take() else {
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/auth/v1/logout", self.url))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(session.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::Session(format!("request failed: {e}")))?;

        // The local session is gone either way; report a server-side failure.
        if !response.status().is_success() {
            return Err(Error::Session(format!(
                "logout returned HTTP {}",
                response.status()
            )));
        }
        info!("operator logged out");
        Ok(())
    }
}
