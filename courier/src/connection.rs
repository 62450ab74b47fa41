use lapin::{
    options::{BasicQosOptions, ExchangeDeclareOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties, ExchangeKind,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bootstrap::{bootstrap, RetryPolicy};
use crate::error::Result;
use crate::event::EXCHANGE_NAME;

/// Configuration for the AMQP connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// AMQP broker URL (e.g., "amqp://localhost:5672/%2f"); credentials, if any,
    /// are injected by the caller
    pub url: String,
    /// Retry policy applied while the broker is not yet reachable
    pub retry: RetryPolicy,
    /// Unacked deliveries a consumer channel may hold
    pub prefetch_count: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "amqp://localhost:5672/%2f".to_string(),
            retry: RetryPolicy::broker_default(),
            prefetch_count: 10,
        }
    }
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// The single process-wide broker connection.
///
/// Cloning is cheap and every clone refers to the same AMQP connection;
/// callers open channels on it and never close it themselves.
#[derive(Clone)]
pub struct BrokerConnection {
    config: ConnectionConfig,
    connection: Arc<Connection>,
}

impl BrokerConnection {
    /// Dial the broker, backing off per `config.retry` until it is ready
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let display_url = redact_url(&config.url);
        debug!("Connecting to RabbitMQ at {}", display_url);

        let url = config.url.clone();
        let connection = bootstrap("rabbitmq", &config.retry, || {
            let url = url.clone();
            async move {
                Connection::connect(
                    &url,
                    ConnectionProperties::default().with_connection_name(
                        format!("courier-{}", uuid::Uuid::new_v4()).into(),
                    ),
                )
                .await
            }
        })
        .await?;

        Ok(Self::from_connection(config, connection))
    }

    /// Wrap an already established connection
    pub fn from_connection(config: ConnectionConfig, connection: Connection) -> Self {
        Self {
            config,
            connection: Arc::new(connection),
        }
    }

    /// Open a fresh channel on the shared connection
    pub async fn create_channel(&self) -> Result<Channel> {
        let channel = self.connection.create_channel().await?;
        debug!(channel = channel.id(), "Created channel");
        Ok(channel)
    }

    /// Open a channel limited to `prefetch_count` unacknowledged deliveries
    pub async fn create_consumer_channel(&self) -> Result<Channel> {
        let channel = self.create_channel().await?;
        channel
            .basic_qos(self.config.prefetch_count, BasicQosOptions::default())
            .await?;
        Ok(channel)
    }

    /// Check if connection is healthy
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// Get connection statistics for monitoring
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            is_connected: self.is_connected(),
            url: redact_url(&self.config.url),
        }
    }
}

impl std::fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConnection")
            .field("url", &redact_url(&self.config.url))
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Connection statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectionStats {
    pub is_connected: bool,
    pub url: String,
}

/// Declare the durable topic exchange; a no-op if it already exists
pub async fn declare_exchange(channel: &Channel) -> Result<()> {
    channel
        .exchange_declare(
            EXCHANGE_NAME,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                auto_delete: false,
                internal: false,
                nowait: false,
                passive: false,
            },
            FieldTable::default(),
        )
        .await?;
    debug!("Declared exchange: {}", EXCHANGE_NAME);
    Ok(())
}

/// Close a short-lived channel, logging instead of failing
pub async fn close_quietly(channel: Channel) {
    if let Err(e) = channel.close(200, "OK").await {
        warn!(channel = channel.id(), "Failed to close channel: {}", e);
    }
}

/// Strip the password from a connection URL before it reaches a log line
pub fn redact_url(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable url>".to_string(),
    }
}
