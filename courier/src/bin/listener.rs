use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use courier::transport::{HttpLogTransport, SyncCall};
use courier::{BrokerConnection, EventSubscriber, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,courier=debug")),
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
    info!("Connected to RabbitMQ");

    let sink = Arc::new(HttpLogTransport::new(SyncCall::new(&settings.services.log_url)));
    let subscriber = EventSubscriber::new(broker, sink, settings.subscriber()).await?;

    info!("Listening for and consuming RabbitMQ messages...");
    subscriber.listen(&settings.topics()).await?;

    Ok(())
}
