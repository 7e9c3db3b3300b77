//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast on malformed or half-configured
//! values. Sensitive values wrapped in secrecy::SecretString to prevent
//! log leaks.

use std::path::PathBuf;
use std::time::Duration;

use crate::engine::DEFAULT_MOBILE_PREFIX;
use crate::error::{Error, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Config {
    /// SQLite file. `None` keeps the queue in memory.
    pub db_path: Option<PathBuf>,
    pub mobile_prefix: String,
    pub notify_on_seat: bool,
    pub templates_path: Option<PathBuf>,
    pub message_timeout: Duration,
    pub twilio: Option<TwilioSettings>,
    pub supabase: Option<SupabaseSettings>,
    pub operator: Option<OperatorCredentials>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

#[derive(Debug)]
pub struct TwilioSettings {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
}

#[derive(Debug)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: SecretString,
}

#[derive(Debug)]
pub struct OperatorCredentials {
    pub email: String,
    pub password: SecretString,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Blank counts as unset.
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let twilio = match (
            var("TWILIO_ACCOUNT_SID"),
            var("TWILIO_AUTH_TOKEN"),
            var("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioSettings {
                account_sid,
                auth_token: SecretString::from(auth_token),
                from_number,
            }),
            (None, None, None) => None,
            _ => {
                return Err(Error::Config(
                    "TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_PHONE_NUMBER must be set together"
                        .to_string(),
                ));
            }
        };

        let supabase = match (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseSettings {
                url,
                anon_key: SecretString::from(anon_key),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "SUPABASE_URL and SUPABASE_ANON_KEY must be set together".to_string(),
                ));
            }
        };

        let operator = match (
            var("WAITLIST_OPERATOR_EMAIL"),
            var("WAITLIST_OPERATOR_PASSWORD"),
        ) {
            (Some(email), Some(password)) => Some(OperatorCredentials {
                email,
                password: SecretString::from(password),
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "WAITLIST_OPERATOR_EMAIL and WAITLIST_OPERATOR_PASSWORD must be set together"
                        .to_string(),
                ));
            }
        };

        Ok(Self {
            db_path: var("WAITLIST_DB_PATH").map(PathBuf::from),
            mobile_prefix: var("WAITLIST_MOBILE_PREFIX")
                .unwrap_or_else(|| DEFAULT_MOBILE_PREFIX.to_string()),
            notify_on_seat: parse_bool("WAITLIST_NOTIFY_ON_SEAT", var("WAITLIST_NOTIFY_ON_SEAT"))?
                .unwrap_or(true),
            templates_path: var("WAITLIST_TEMPLATES").map(PathBuf::from),
            message_timeout: Duration::from_secs(parse_timeout_secs(var(
                "MESSAGE_TIMEOUT_SECS",
            ))?),
            twilio,
            supabase,
            operator,
            otel_endpoint: var("OTEL_ENDPOINT"),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn parse_bool(name: &str, value: Option<String>) -> Result<Option<bool>> {
    value
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(Error::Config(format!("{name} must be a boolean, got {v:?}"))),
        })
        .transpose()
}

/// A zero deadline would fail every send.
fn parse_timeout_secs(value: Option<String>) -> Result<u64> {
    match parse_u64("MESSAGE_TIMEOUT_SECS", value)? {
        Some(0) => Err(Error::Config(
            "MESSAGE_TIMEOUT_SECS must be at least 1".to_string(),
        )),
        Some(secs) => Ok(secs),
        None => Ok(10),
    }
}

fn parse_u64(name: &str, value: Option<String>) -> Result<Option<u64>> {
    value
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{name} must be a whole number, got {v:?}")))
        })
        .transpose()
}
