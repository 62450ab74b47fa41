use async_trait::async_trait;

use super::{Transport, TransportReply};
use crate::error::Result;
use crate::event::{LogEvent, Severity};
use crate::publisher::EventPublisher;

/// Enqueues the log event on the topic exchange at `INFO` and returns once written
#[derive(Debug, Clone)]
pub struct PublishTransport {
    publisher: EventPublisher,
}

impl PublishTransport {
    pub fn new(publisher: EventPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Transport for PublishTransport {
    type Request = LogEvent;

    async fn invoke(&self, request: &LogEvent) -> Result<TransportReply> {
        self.publisher.publish(request, Severity::Info).await?;
        Ok(TransportReply::new("logged via RabbitMQ"))
    }

    fn name(&self) -> &'static str {
        "log_rmq"
    }
}
