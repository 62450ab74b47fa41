//! Fire-and-forget publishing onto the topic exchange.

use lapin::{options::BasicPublishOptions, BasicProperties};
use tracing::debug;

use crate::connection::{close_quietly, declare_exchange, BrokerConnection};
use crate::error::Result;
use crate::event::{routing_key, LogEvent, Severity, EXCHANGE_NAME};

/// Publishes [`LogEvent`]s with routing key `log.<SEVERITY>`.
///
/// A publish returns as soon as the frame is written; broker confirmations are
/// never awaited, so only errors raised by the write itself surface.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    connection: BrokerConnection,
}

impl EventPublisher {
    /// Create a publisher, declaring the exchange once up front
    pub async fn new(connection: BrokerConnection) -> Result<Self> {
        let channel = connection.create_channel().await?;
        declare_exchange(&channel).await?;
        close_quietly(channel).await;
        Ok(Self { connection })
    }

    pub async fn publish(&self, event: &LogEvent, severity: Severity) -> Result<()> {
        self.publish_raw(event, severity.as_str()).await
    }

    /// Publish with a caller-chosen severity tag
    pub async fn publish_raw(&self, event: &LogEvent, severity: &str) -> Result<()> {
        let key = routing_key(severity);
        let payload = event.to_bytes()?;

        let channel = self.connection.create_channel().await?;
        declare_exchange(&channel).await?;

        // Publisher confirms are not awaited
        let _confirm = channel
            .basic_publish(
                EXCHANGE_NAME,
                &key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await?;

        debug!(routing_key = %key, name = %event.name, "Published event");
        close_quietly(channel).await;
        Ok(())
    }
}
