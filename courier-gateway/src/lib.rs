//! # Courier Gateway
//!
//! Accepts a tagged JSON envelope and hands its payload to exactly one
//! transport adapter, answering with `{error, message, data?}`.
//!
//! ```text
//! Client -> POST /handle {action, auth?, log?, mail?}
//!        -> GatewayRouter picks the adapter for `action`
//!        -> HTTP | binary RPC | gRPC | RabbitMQ publish
//!        <- {error, message, data?}
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use courier::{BrokerConnection, EventPublisher, Settings};
//! use courier_gateway::{create_router, GatewayRouter, GatewayState, TransportRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let broker = BrokerConnection::connect(settings.broker_connection()).await?;
//!     let publisher = EventPublisher::new(broker.clone()).await?;
//!
//!     let registry = TransportRegistry::new(&settings.services, publisher);
//!     let app = create_router(GatewayState {
//!         router: Arc::new(GatewayRouter::new(registry)),
//!         broker: Some(broker),
//!     });
//!
//!     let listener = tokio::net::TcpListener::bind(&settings.gateway.bind_address).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod registry;
pub mod router;

pub use registry::{AuthAdapter, LogAdapter, MailAdapter, TransportRegistry};
pub use router::{create_router, normalize, Action, GatewayRouter, GatewayState, Request};
