use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use courier::{BrokerConnection, EventPublisher, Settings};
use courier_gateway::{create_router, GatewayRouter, GatewayState, TransportRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,courier=debug,courier_gateway=debug")),
        )
        .with_target(false)
        .init();

    let settings = Settings::new()?;

    let broker = match BrokerConnection::connect(settings.broker_connection()).await {
        Ok(broker) => broker,
        Err(e) => {
            error!("RabbitMQ never became ready: {}", e);
            std::process::exit(1);
        }
    };
    let publisher = EventPublisher::new(broker.clone()).await?;

    let registry = TransportRegistry::new(&settings.services, publisher);
    let app = create_router(GatewayState {
        router: Arc::new(GatewayRouter::new(registry)),
        broker: Some(broker),
    });

    let listener = tokio::net::TcpListener::bind(&settings.gateway.bind_address).await?;
    info!("Starting gateway on {}", settings.gateway.bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}
