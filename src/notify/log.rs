//! Sender used when no SMS provider is configured.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{MessageReceipt, MessageSender};
use crate::error::Result;

/// Logs the message instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send_message(&self, to: &str, body: &str) -> Result<MessageReceipt> {
        let provider_id = format!("log-{}", Uuid::new_v4());
        info!(to, body, %provider_id, "message not delivered: no provider configured");
        Ok(MessageReceipt {
            accepted: true,
            provider_id,
        })
    }
}
