//! Outbound messaging to a party's mobile number.
//!
//! The engine has no network dependency; senders are injected into the
//! [`Waitlist`](crate::service::Waitlist) front door. A failed send is
//! reported but never rolls back a queue transition.

mod log;
mod twilio;

pub use log::LogSender;
pub use twilio::{TwilioConfig, TwilioSender};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use opentelemetry::KeyValue;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::CustomerRecord;
use crate::telemetry::metrics;

/// Provider acknowledgement for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReceipt {
    pub accepted: bool,
    /// Provider-side message id (e.g. a Twilio SID).
    pub provider_id: String,
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> Result<MessageReceipt>;
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Message bodies. Placeholders: `{name}`, `{party_size}`, `{table}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub table_ready: String,
    pub call: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            table_ready: "Hi {name}, your table {table} is ready. Please come to the host stand."
                .to_string(),
            call: "Hi {name}, we're ready for your party of {party_size}.".to_string(),
        }
    }
}

/// Top-level TOML wrapper.
#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    messages: MessageTemplates,
}

impl MessageTemplates {
    /// Load from a TOML file with a `[messages]` table. Missing keys keep
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
            .map_err(|e| Error::Config(format!("bad template file {}: {e}", path.display())))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        let file: TemplateFile = toml::from_str(content)?;
        Ok(file.messages)
    }

    pub fn render_table_ready(&self, record: &CustomerRecord) -> String {
        render(&self.table_ready, record)
    }

    pub fn render_call(&self, record: &CustomerRecord) -> String {
        render(&self.call, record)
    }
}

/// Single pass over the template. Substituted values are never rescanned,
/// so braces inside a customer's name come through literally. Unknown
/// placeholders are kept as written.
fn render(template: &str, record: &CustomerRecord) -> String {
    let mut out = String::with_capacity(template.len() + record.name.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            rest = tail;
            break;
        };
        match &tail[1..close] {
            "name" => out.push_str(&record.name),
            "party_size" => out.push_str(&record.party_size.to_string()),
            "table" => {
                if let Some(n) = record.table_number {
                    out.push_str(&n.to_string());
                }
            }
            _ => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What a message is for. Used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    TableReady,
    Call,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::TableReady => "table_ready",
            NoticeKind::Call => "call",
        }
    }
}

/// Send one message with a deadline, logging and counting the outcome.
pub async fn deliver(
    sender: &Arc<dyn MessageSender>,
    kind: NoticeKind,
    to: &str,
    body: &str,
    timeout: Duration,
) -> Result<MessageReceipt> {
    let result = match tokio::time::timeout(timeout, sender.send_message(to, body)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Messaging(format!("no response within {timeout:?}"))),
    };

    let label = if result.is_ok() { "ok" } else { "error" };
    metrics::messages_sent().add(
        1,
        &[
            KeyValue::new("kind", kind.as_str()),
            KeyValue::new("result", label),
        ],
    );

    match &result {
        Ok(receipt) => info!(kind = kind.as_str(), provider_id = %receipt.provider_id, "message sent"),
        Err(e) => warn!(kind = kind.as_str(), error = %e, "message failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomerId;
    use chrono::Utc;

    fn record() -> CustomerRecord {
        CustomerRecord {
            id: CustomerId::new(),
            name: "Sam".to_string(),
            party_size: 4,
            mobile_number: "+971509999999".to_string(),
            arrival_time: Utc::now(),
            table_number: Some(12),
            seated_time: Some(Utc::now()),
            finished_time: None,
            canceled_time: None,
        }
    }

    #[test]
    fn default_templates_fill_placeholders() {
        let t = MessageTemplates::default();
        assert_eq!(
            t.render_table_ready(&record()),
            "Hi Sam, your table 12 is ready. Please come to the host stand."
        );
        assert_eq!(t.render_call(&record()), "Hi Sam, we're ready for your party of 4.");
    }

    #[test]
    fn braces_in_names_are_not_expanded() {
        let mut r = record();
        r.name = "{party_size}{table}".to_string();
        r.party_size = 2;
        r.table_number = Some(7);

        assert_eq!(
            MessageTemplates::default().render_table_ready(&r),
            "Hi {party_size}{table}, your table 7 is ready. Please come to the host stand."
        );
    }

    #[test]
    fn unknown_and_unclosed_placeholders_are_kept() {
        let t = MessageTemplates {
            table_ready: "{greeting} {name}, table {table".to_string(),
            call: String::new(),
        };
        assert_eq!(t.render_table_ready(&record()), "{greeting} Sam, table {table");
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let t = MessageTemplates::from_toml(
            r#"
            [messages]
            table_ready = "{name}: table {table}"
            "#,
        )
        .unwrap();
        assert_eq!(t.render_table_ready(&record()), "Sam: table 12");
        assert_eq!(t.call, MessageTemplates::default().call);
    }

    struct Stalled;

    #[async_trait]
    impl MessageSender for Stalled {
        async fn send_message(&self, _to: &str, _body: &str) -> Result<MessageReceipt> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn deliver_times_out_as_messaging_error() {
        let sender: Arc<dyn MessageSender> = Arc::new(Stalled);
        let err = deliver(
            &sender,
            NoticeKind::Call,
            "+971500000000",
            "hi",
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();
        assert!(err.is_external());
        assert!(err.to_string().contains("20ms"), "{err}");
    }
}
