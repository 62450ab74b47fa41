//! # Courier - inter-service message routing and delivery
//!
//! Courier moves requests and log events between services over four
//! transports, and carries the topic publish/subscribe pipeline that feeds
//! the logger.
//!
//! ## Pieces
//!
//! - [`bootstrap`]: bounded-retry connection to a dependency that may not be up yet
//! - [`transport`]: HTTP, binary RPC, gRPC and publish adapters behind one `invoke`
//! - [`publisher`] / [`subscriber`]: the `logs_topic` exchange, routed by `log.<SEVERITY>`
//! - [`worker`]: the bounded pool the subscriber dispatches into
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use courier::{BrokerConnection, ConnectionConfig, EventSubscriber, SubscriberConfig};
//! use courier::transport::{HttpLogTransport, SyncCall};
//!
//! #[tokio::main]
//! async fn main() -> courier::Result<()> {
//!     let broker = BrokerConnection::connect(ConnectionConfig::new("amqp://localhost:5672/%2f")).await?;
//!     let sink = Arc::new(HttpLogTransport::new(SyncCall::new("http://logger-service")));
//!
//!     let subscriber = EventSubscriber::new(broker, sink, SubscriberConfig::default()).await?;
//!     subscriber.listen(&["log.INFO".into(), "log.ERROR".into()]).await
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod grpc;
pub mod message;
pub mod publisher;
pub mod rpc;
#[cfg(feature = "postgres")]
pub mod store;
pub mod subscriber;
pub mod transport;
pub mod worker;

pub use bootstrap::{bootstrap, Backoff, RetryPolicy};
pub use config::Settings;
pub use connection::{BrokerConnection, ConnectionConfig};
pub use error::{CourierError, Result};
pub use event::{BindingPattern, LogEvent, Severity, EXCHANGE_NAME};
pub use message::{AuthPayload, MailPayload, RequestEnvelope, UniformResponse};
pub use publisher::EventPublisher;
pub use subscriber::{AckMode, EventSink, EventSubscriber, SubscriberConfig};
pub use transport::{Transport, TransportReply};
pub use worker::WorkerPool;
