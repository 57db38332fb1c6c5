use crate::domain::ports::{NotificationSink, OutboundMessage};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Simulated delivery: records each rendered message as a structured log line.
///
/// Stands in for an email provider until one is wired up; anything
/// implementing [`NotificationSink`] can replace it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, message: OutboundMessage) -> Result<()> {
        let message_id = Uuid::now_v7();
        info!(
            channel = "email",
            %message_id,
            to = %message.to,
            kind = %message.kind,
            subject = %message.subject,
            "simulated notification delivery"
        );
        Ok(())
    }
}
