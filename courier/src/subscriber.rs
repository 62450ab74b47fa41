//! Continuous consumption of the topic exchange into a downstream sink.
//!
//! The subscriber owns a private, broker-named, exclusive queue bound to the
//! caller's patterns. Deliveries are handed to a bounded [`WorkerPool`]; the
//! consume loop only blocks when that pool's queue is full. The backlog is
//! visible through [`EventSubscriber::queue_depth`].

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicConsumeOptions, BasicNackOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, Queue,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::connection::{close_quietly, declare_exchange, BrokerConnection};
use crate::error::{CourierError, Result};
use crate::event::{BindingPattern, LogEvent, EXCHANGE_NAME};
use crate::worker::{QueueDepth, WorkerPool};

/// Where consumed events end up
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &LogEvent) -> Result<()>;

    fn name(&self) -> &'static str {
        "EventSink"
    }
}

/// When a delivery is considered done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Acked as soon as it is dequeued, before the sink runs. A failed
    /// forward is logged and lost.
    #[default]
    AtMostOnce,
    /// Acked after the sink succeeds. A recoverable failure requeues once; a
    /// failure on redelivery, or one that retrying cannot fix, rejects without
    /// requeue, which routes the message to the queue's dead-letter exchange
    /// when the broker has one configured.
    AtLeastOnce,
}

/// Subscriber tuning
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub ack_mode: AckMode,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            queue_capacity: 256,
            ack_mode: AckMode::AtMostOnce,
        }
    }
}

/// What to tell the broker about a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Nothing to send at this point
    None,
    Ack,
    Requeue,
    Reject,
}

impl Settlement {
    /// Settlement sent on dequeue, before the delivery is handed to a worker
    pub fn on_dequeue(mode: AckMode) -> Self {
        match mode {
            AckMode::AtMostOnce => Settlement::Ack,
            AckMode::AtLeastOnce => Settlement::None,
        }
    }

    /// Settlement sent once the sink has run
    pub fn decide(mode: AckMode, outcome: &Result<()>, redelivered: bool) -> Self {
        match (mode, outcome) {
            (AckMode::AtMostOnce, _) => Settlement::None,
            (AckMode::AtLeastOnce, Ok(())) => Settlement::Ack,
            (AckMode::AtLeastOnce, Err(e)) if redelivered || !e.is_recoverable() => Settlement::Reject,
            (AckMode::AtLeastOnce, Err(_)) => Settlement::Requeue,
        }
    }
}

/// Consumes `log.*` events and forwards them to an [`EventSink`]
pub struct EventSubscriber {
    connection: BrokerConnection,
    sink: Arc<dyn EventSink>,
    config: SubscriberConfig,
    depth: QueueDepth,
}

impl EventSubscriber {
    /// Create a subscriber; declares the exchange so it exists before binding
    pub async fn new(
        connection: BrokerConnection,
        sink: Arc<dyn EventSink>,
        config: SubscriberConfig,
    ) -> Result<Self> {
        let channel = connection.create_channel().await?;
        declare_exchange(&channel).await?;
        close_quietly(channel).await;

        Ok(Self {
            connection,
            sink,
            config,
            depth: QueueDepth::default(),
        })
    }

    /// Messages dequeued from the broker but not yet picked up by a worker
    pub fn queue_depth(&self) -> usize {
        self.depth.get()
    }

    /// Bind a private queue to `topics` and consume until the channel closes
    pub async fn listen(&self, topics: &[BindingPattern]) -> Result<()> {
        // prefetch bounds unacked deliveries in both modes
        let channel = self.connection.create_consumer_channel().await?;
        declare_exchange(&channel).await?;

        let queue = declare_private_queue(&channel).await?;
        let queue_name = queue.name().as_str().to_string();
        for topic in topics {
            channel
                .queue_bind(
                    &queue_name,
                    topic.as_str(),
                    EXCHANGE_NAME,
                    QueueBindOptions::default(),
                    FieldTable::default(),
                )
                .await?;
            debug!(queue = %queue_name, pattern = %topic, "Bound queue");
        }

        let consumer_tag = format!("courier-listener-{}", Uuid::new_v4());
        let mut consumer = channel
            .basic_consume(
                &queue_name,
                &consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    exclusive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let sink = self.sink.clone();
        let ack_mode = self.config.ack_mode;
        let pool = WorkerPool::spawn_with_depth(
            self.config.workers,
            self.config.queue_capacity,
            self.depth.clone(),
            move |delivery: Delivery| {
                let sink = sink.clone();
                async move { handle_delivery(delivery, sink.as_ref(), ack_mode).await }
            },
        );

        info!(
            "Waiting for messages [Exchange, Queue] [{}, {}] with {} workers",
            EXCHANGE_NAME,
            queue_name,
            pool.worker_count()
        );

        while let Some(delivery) = consumer.next().await {
            match delivery {
                Ok(delivery) => {
                    settle(&delivery, Settlement::on_dequeue(ack_mode)).await;
                    pool.submit(delivery).await?;
                    debug!(depth = pool.depth(), "Dispatched delivery");
                }
                Err(e) => {
                    error!("Error receiving message: {}", e);
                }
            }
        }

        warn!(queue = %queue_name, "Consumer stopped, draining workers");
        pool.shutdown().await
    }
}

/// Declare a server-named, exclusive queue that lives as long as this connection
async fn declare_private_queue(channel: &Channel) -> Result<Queue> {
    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                durable: false,
                exclusive: true,
                auto_delete: false,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(queue)
}

/// Decode a delivery body and hand it to the sink
pub async fn process(body: &[u8], sink: &dyn EventSink) -> Result<()> {
    let event = LogEvent::from_bytes(body)
        .map_err(|e| CourierError::delivery_error(format!("undecodable event: {}", e)))?;
    sink.deliver(&event).await
}

async fn handle_delivery(delivery: Delivery, sink: &dyn EventSink, ack_mode: AckMode) {
    let outcome = process(&delivery.data, sink).await;
    if let Err(e) = &outcome {
        error!(routing_key = %delivery.routing_key.as_str(), sink = sink.name(), "Failed to forward event: {}", e);
    }

    settle(&delivery, Settlement::decide(ack_mode, &outcome, delivery.redelivered)).await;
}

async fn settle(delivery: &Delivery, settlement: Settlement) {
    let settled = match settlement {
        Settlement::None => Ok(()),
        Settlement::Ack => delivery.ack(BasicAckOptions::default()).await,
        Settlement::Requeue => {
            delivery
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue: true,
                })
                .await
        }
        Settlement::Reject => {
            warn!(routing_key = %delivery.routing_key.as_str(), "Redelivery failed, rejecting");
            delivery
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue: false,
                })
                .await
        }
    };

    if let Err(e) = settled {
        error!("Failed to settle delivery: {}", e);
    }
}
