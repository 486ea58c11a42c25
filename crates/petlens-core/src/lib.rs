//! PetLens Core - queue-driven pet image classification.
//!
//! PetLens consumes `image.uploaded` notifications, classifies the referenced
//! image with a pretrained model, and publishes a `cat` or `dog` result to a
//! downstream queue.
//!
//! # Architecture
//!
//! Every stage except the worker is a stateless transformation:
//!
//! ```text
//! Queue → Parse → Fetch (HTTP) → Preprocess → Classify (ONNX) → Resolve → Publish → Ack
//! ```
//!
//! Every message is acknowledged exactly once, whatever happens to it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use petlens_core::{AmqpBroker, Config, HttpFetcher, OnnxClassifier, Worker};
//!
//! #[tokio::main]
//! async fn main() -> petlens_core::Result<()> {
//!     let config = Config::load()?;
//!     let classifier = Arc::new(OnnxClassifier::load(&config)?);
//!     let broker = Arc::new(AmqpBroker::connect(&config.broker, &config.variant.output_queue).await?);
//!     let fetcher = Box::new(HttpFetcher::new(&config.fetch)?);
//!
//!     let mut worker = Worker::new(broker, fetcher, classifier, config.variant.clone());
//!     worker.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod broker;
pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod math;
pub mod resolve;
pub mod types;
pub mod worker;

// Re-exports for convenient access
pub use broker::{AmqpBroker, Broker, Delivery, MemoryBroker};
pub use classify::{ImageClassifier, OnnxClassifier};
pub use config::{Config, VariantConfig};
pub use error::{
    BrokerError, ConfigError, ModelError, PipelineError, PipelineResult, Result, WorkerError,
};
pub use fetch::{DecodedImage, HttpFetcher, ImageSource};
pub use resolve::resolve;
pub use types::{Category, InboundEvent, OutboundEvent, Prediction, Resolution};
pub use worker::{Identification, Outcome, RunSummary, SkipReason, StopReason, Worker};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
