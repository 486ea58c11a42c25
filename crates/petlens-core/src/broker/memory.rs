//! In-process broker backend.
//!
//! Deliveries are queued with [`MemoryBroker::push`]; `receive` returns
//! `None` once the queue drains, which ends the worker loop. Publishes and
//! acks are recorded for inspection.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Broker, Delivery};
use crate::error::BrokerError;

/// A message recorded by [`MemoryBroker::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub queue: String,
    pub body: Vec<u8>,
}

/// Broker that keeps all state in memory.
#[derive(Default)]
pub struct MemoryBroker {
    pending: Mutex<VecDeque<Delivery>>,
    published: Mutex<Vec<Published>>,
    acked: Mutex<Vec<u64>>,
    requeued: Mutex<Vec<u64>>,
    next_tag: AtomicU64,
    fail_publish: AtomicBool,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw body for delivery; returns its delivery tag.
    pub fn push(&self, body: impl Into<Vec<u8>>) -> u64 {
        let delivery_tag = self.next_tag.fetch_add(1, Ordering::SeqCst) + 1;
        lock(&self.pending).push_back(Delivery {
            delivery_tag,
            body: body.into(),
            redelivered: false,
        });
        delivery_tag
    }

    /// Make every subsequent publish fail.
    pub fn fail_publishes(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<Published> {
        lock(&self.published).clone()
    }

    /// Delivery tags acknowledged so far, in order.
    pub fn acked(&self) -> Vec<u64> {
        lock(&self.acked).clone()
    }

    /// Delivery tags negatively acknowledged so far, in order.
    pub fn requeued(&self) -> Vec<u64> {
        lock(&self.requeued).clone()
    }

    /// Deliveries not yet received.
    pub fn pending(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    fn name(&self) -> &str {
        "memory"
    }

    async fn receive(&self) -> Result<Option<Delivery>, BrokerError> {
        if self.is_closed() {
            return Err(BrokerError::Consume("broker is closed".to_string()));
        }
        Ok(lock(&self.pending).pop_front())
    }

    async fn publish(&self, queue: &str, body: &[u8]) -> Result<(), BrokerError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish {
                queue: queue.to_string(),
                message: "publish rejected".to_string(),
            });
        }
        lock(&self.published).push(Published {
            queue: queue.to_string(),
            body: body.to_vec(),
        });
        Ok(())
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        let mut acked = lock(&self.acked);
        if acked.contains(&delivery_tag) {
            return Err(BrokerError::Ack {
                delivery_tag,
                message: "already acknowledged".to_string(),
            });
        }
        acked.push(delivery_tag);
        Ok(())
    }

    async fn requeue(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        let mut requeued = lock(&self.requeued);
        requeued.push(delivery_tag);
        Ok(())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_receive_in_order() {
        let broker = MemoryBroker::new();
        let first = broker.push("a");
        let second = broker.push("b");
        assert_eq!((first, second), (1, 2));

        let d = broker.receive().await.unwrap().unwrap();
        assert_eq!(d.delivery_tag, 1);
        assert_eq!(d.body, b"a");
        assert_eq!(broker.pending(), 1);
    }

    #[tokio::test]
    async fn test_receive_none_when_drained() {
        let broker = MemoryBroker::new();
        assert!(broker.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_double_ack_rejected() {
        let broker = MemoryBroker::new();
        broker.ack(1).await.unwrap();
        assert!(broker.ack(1).await.is_err());
        assert_eq!(broker.acked(), vec![1]);
    }

    #[tokio::test]
    async fn test_failing_publish() {
        let broker = MemoryBroker::new();
        broker.fail_publishes(true);
        assert!(broker.publish("q", b"{}").await.is_err());
        assert!(broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_close() {
        let broker = MemoryBroker::new();
        broker.close().await.unwrap();
        assert!(broker.is_closed());
        assert!(broker.receive().await.is_err());
    }
}
