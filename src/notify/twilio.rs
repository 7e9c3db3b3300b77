//! Twilio Programmable Messaging client.
//!
//! `POST {base}/2010-04-01/Accounts/{sid}/Messages.json` with form fields
//! `To`, `From`, `Body` and basic auth (account SID, auth token).

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{MessageReceipt, MessageSender};
use crate::error::{Error, Result};

/// Canonical Twilio REST API base URL.
pub const TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// Sending number, e.g. "+14695027123".
    pub from_number: String,
    /// Overridable for tests.
    pub base_url: String,
    pub timeout: Duration,
}

impl TwilioConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: SecretString,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token,
            from_number: from_number.into(),
            base_url: TWILIO_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct TwilioSender {
    client: reqwest::Client,
    config: TwilioConfig,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResource {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

impl TwilioSender {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Messaging(format!("cannot build http client: {e}")))?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send_message(&self, to: &str, body: &str) -> Result<MessageReceipt> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Messaging(format!("cannot read response: {e}")))?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<ErrorResource>(&text) {
                Ok(ErrorResource {
                    code: Some(code),
                    message,
                }) => format!("{message} (code {code})"),
                Ok(ErrorResource { message, .. }) => message,
                Err(_) => text,
            };
            return Err(Error::Messaging(format!("HTTP {status}: {detail}")));
        }

        let message: MessageResource = serde_json::from_str(&text)
            .map_err(|e| Error::Messaging(format!("unexpected response: {e}")))?;

        Ok(MessageReceipt {
            accepted: message.status.as_deref() != Some("failed"),
            provider_id: message.sid,
        })
    }
}
