//! Durable queue broker abstraction.
//!
//! The worker only needs a handful of operations from a broker: receive the
//! next delivery, publish a body to a named queue, settle a delivery, and
//! close. [`AmqpBroker`] speaks AMQP 0.9.1 via `lapin`; [`MemoryBroker`]
//! keeps everything in process for tests and dry runs.

pub mod amqp;
pub mod memory;

use async_trait::async_trait;

use crate::error::BrokerError;

pub use amqp::AmqpBroker;
pub use memory::MemoryBroker;

/// A message received from the input queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Broker-assigned tag used to acknowledge this delivery
    pub delivery_tag: u64,
    /// Raw message body
    pub body: Vec<u8>,
    /// Whether the broker has delivered this message before
    pub redelivered: bool,
}

/// Trait that all broker backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the CLI picks a backend at runtime).
#[async_trait]
pub trait Broker: Send + Sync {
    /// Backend name for logging (e.g., "amqp", "memory").
    fn name(&self) -> &str;

    /// Wait for the next delivery. `Ok(None)` means the consumer was closed.
    async fn receive(&self) -> Result<Option<Delivery>, BrokerError>;

    /// Publish a JSON body to a durable queue.
    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), BrokerError>;

    /// Acknowledge a delivery so the broker never redelivers it.
    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError>;

    /// Negatively acknowledge a delivery and return it to the queue.
    async fn requeue(&self, delivery_tag: u64) -> Result<(), BrokerError>;

    /// Release the channel and connection.
    async fn close(&self) -> Result<(), BrokerError>;
}
