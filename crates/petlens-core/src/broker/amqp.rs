//! AMQP 0.9.1 broker backend (RabbitMQ) using `lapin`.
//!
//! Declares the input and output queues as durable on connect, limits the
//! channel to `prefetch` unacknowledged deliveries, and publishes through the
//! default exchange with persistent delivery mode.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::Mutex;

use super::{Broker, Delivery};
use crate::config::BrokerConfig;
use crate::error::BrokerError;

/// AMQP reply code for a normal close.
const REPLY_SUCCESS: u16 = 200;

/// Persistent delivery mode, so published results survive a broker restart.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Broker connected to a RabbitMQ-compatible server.
pub struct AmqpBroker {
    connection: Connection,
    channel: Channel,
    consumer: Mutex<Consumer>,
}

impl AmqpBroker {
    /// Connect, declare both queues, and start consuming the input queue.
    pub async fn connect(config: &BrokerConfig, output_queue: &str) -> Result<Self, BrokerError> {
        let properties = ConnectionProperties::default()
            .with_connection_name(config.consumer_tag.clone().into());

        let connection = Connection::connect(&config.uri, properties)
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Connect(format!("Failed to open channel: {e}")))?;

        // Declaration is idempotent as long as the flags match.
        for queue in [config.input_queue.as_str(), output_queue] {
            channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| BrokerError::Setup {
                    queue: queue.to_string(),
                    message: e.to_string(),
                })?;
        }

        channel
            .basic_qos(config.prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| BrokerError::Setup {
                queue: config.input_queue.clone(),
                message: format!("Failed to set prefetch: {e}"),
            })?;

        let consumer = channel
            .basic_consume(
                &config.input_queue,
                &config.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Setup {
                queue: config.input_queue.clone(),
                message: format!("Failed to start consumer: {e}"),
            })?;

        tracing::info!(
            "Connected to broker at {} (consuming {}, publishing {})",
            redact_uri(&config.uri),
            config.input_queue,
            output_queue
        );

        Ok(Self {
            connection,
            channel,
            consumer: Mutex::new(consumer),
        })
    }
}

#[async_trait]
impl Broker for AmqpBroker {
    fn name(&self) -> &str {
        "amqp"
    }

    async fn receive(&self) -> Result<Option<Delivery>, BrokerError> {
        let mut consumer = self.consumer.lock().await;
        match consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(Delivery {
                delivery_tag: delivery.delivery_tag,
                body: delivery.data,
                redelivered: delivery.redelivered,
            })),
            Some(Err(e)) => Err(BrokerError::Consume(e.to_string())),
            None => Ok(None),
        }
    }

    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), BrokerError> {
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT);

        let publish_err = |e: lapin::Error| BrokerError::Publish {
            queue: queue.to_string(),
            message: e.to_string(),
        };

        self.channel
            .basic_publish("", queue, BasicPublishOptions::default(), body, properties)
            .await
            .map_err(publish_err)?
            .await
            .map_err(publish_err)?;
        Ok(())
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| BrokerError::Ack {
                delivery_tag,
                message: e.to_string(),
            })
    }

    async fn requeue(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.channel
            .basic_nack(
                delivery_tag,
                BasicNackOptions {
                    multiple: false,
                    requeue: true,
                },
            )
            .await
            .map_err(|e| BrokerError::Ack {
                delivery_tag,
                message: format!("nack failed: {e}"),
            })
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.channel
            .close(REPLY_SUCCESS, "worker shutdown")
            .await
            .map_err(|e| BrokerError::Connect(format!("Failed to close channel: {e}")))?;
        self.connection
            .close(REPLY_SUCCESS, "worker shutdown")
            .await
            .map_err(|e| BrokerError::Connect(format!("Failed to close connection: {e}")))?;
        tracing::debug!("Broker connection closed");
        Ok(())
    }
}

/// Strip credentials from a broker URI for logging.
pub fn redact_uri(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &uri[..scheme_end], &uri[at + 1..])
        }
        _ => uri.to_string(),
    }
}
