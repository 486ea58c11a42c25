//! The consume-classify-publish loop.
//!
//! One message is in flight at a time:
//!
//! ```text
//! receive → parse → fetch → preprocess → classify → resolve → publish → ack
//! ```
//!
//! Each stage returns a `Result`; [`Worker::handle`] folds them into an
//! [`Outcome`], and [`Outcome::disposition`] decides how the delivery is
//! settled. Stage failures never escape the loop. Broker faults (a dead
//! channel, a failed ack) do, because the worker cannot make progress
//! without one.

pub mod outcome;
pub mod stats;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;

use crate::broker::{Broker, Delivery};
use crate::classify::ImageClassifier;
use crate::config::VariantConfig;
use crate::error::{BrokerError, PipelineError, PipelineResult, WorkerError};
use crate::fetch::decode::format_to_string;
use crate::fetch::ImageSource;
use crate::resolve::resolve;
use crate::types::{Category, InboundEvent, OutboundEvent, Prediction, Resolution};

pub use outcome::{Disposition, Outcome, SkipReason};
pub use stats::WorkerStats;

/// Result of running one image through fetch, classification, and resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Identification {
    pub url: String,
    #[serde(flatten)]
    pub resolution: Resolution,
    pub predictions: Vec<Prediction>,
}

/// Why the run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future completed
    Shutdown,
    /// The broker closed the consumer (or an in-memory queue drained)
    ConsumerClosed,
}

/// Summary returned by [`Worker::run_until`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub reason: StopReason,
    pub stats: WorkerStats,
}

/// The message pipeline, with all collaborators passed in at construction.
pub struct Worker {
    broker: Arc<dyn Broker>,
    fetcher: Box<dyn ImageSource>,
    classifier: Arc<dyn ImageClassifier>,
    variant: VariantConfig,
    stats: WorkerStats,
}

impl Worker {
    /// Create a worker.
    ///
    /// The classifier is shared with blocking tasks and must already be
    /// loaded; it is never reloaded or mutated.
    pub fn new(
        broker: Arc<dyn Broker>,
        fetcher: Box<dyn ImageSource>,
        classifier: Arc<dyn ImageClassifier>,
        variant: VariantConfig,
    ) -> Self {
        Self {
            broker,
            fetcher,
            classifier,
            variant,
            stats: WorkerStats::default(),
        }
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Consume until `shutdown` completes or the consumer closes.
    ///
    /// Shutdown is only observed between messages, so an in-flight message
    /// is always finished and settled first. The broker is closed on every
    /// exit path.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<RunSummary, WorkerError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            "Waiting for messages (broker: {}, output queue: {})",
            self.broker.name(),
            self.variant.output_queue
        );

        let result = self.consume(shutdown).await;

        if let Err(e) = self.broker.close().await {
            tracing::warn!("Failed to close broker cleanly: {e}");
        }

        tracing::info!(
            "Worker stopped: {} received, {} published, {} skipped, {} failed ({:.1}ms avg)",
            self.stats.received,
            self.stats.published,
            self.stats.skipped,
            self.stats.failed,
            self.stats.mean_ms()
        );

        let reason = result?;
        Ok(RunSummary {
            reason,
            stats: self.stats.clone(),
        })
    }

    async fn consume<F>(&mut self, shutdown: F) -> Result<StopReason, WorkerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let delivery = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    return Ok(StopReason::Shutdown);
                }
                received = self.broker.receive() => match received? {
                    Some(delivery) => delivery,
                    None => {
                        tracing::warn!("Consumer closed");
                        return Ok(StopReason::ConsumerClosed);
                    }
                },
            };
            self.process(delivery).await?;
        }
    }

    /// Handle, log, record, and settle a single delivery.
    pub async fn process(&mut self, delivery: Delivery) -> Result<Outcome, BrokerError> {
        let span = tracing::info_span!(
            "message",
            delivery_tag = delivery.delivery_tag,
            image_url = tracing::field::Empty
        );

        async {
            if delivery.redelivered {
                tracing::debug!("Redelivered message");
            }

            let start = Instant::now();
            let outcome = self.handle(&delivery.body).await;
            let elapsed = start.elapsed();

            match &outcome {
                Outcome::Published(event) => tracing::info!(
                    "Published {} to {} in {:?}",
                    serde_json::to_string(event).unwrap_or_default(),
                    self.variant.output_queue,
                    elapsed
                ),
                Outcome::Skipped(reason) => {
                    tracing::debug!(reason = reason.as_str(), "Skipped message")
                }
                Outcome::Failed(e) => {
                    tracing::warn!(stage = e.stage(), error = %e, "Dropping message")
                }
            }

            self.stats.record(&outcome, elapsed);
            self.settle(delivery.delivery_tag, &outcome).await?;
            Ok::<_, BrokerError>(outcome)
        }
        .instrument(span)
        .await
    }

    /// Apply the outcome's disposition to a delivery.
    pub async fn settle(&self, delivery_tag: u64, outcome: &Outcome) -> Result<(), BrokerError> {
        match outcome.disposition() {
            Disposition::Ack => self.broker.ack(delivery_tag).await,
            Disposition::Requeue => self.broker.requeue(delivery_tag).await,
        }
    }

    /// Run the pipeline stages for one raw message body.
    ///
    /// Never fails: stage errors become [`Outcome::Failed`].
    pub async fn handle(&self, body: &[u8]) -> Outcome {
        match self.try_handle(body).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(e),
        }
    }

    async fn try_handle(&self, body: &[u8]) -> PipelineResult<Outcome> {
        let event =
            InboundEvent::from_slice(body).map_err(|e| PipelineError::Parse(e.to_string()))?;

        let Some(url) = event.image_url()?.map(str::to_string) else {
            return Ok(Outcome::Skipped(SkipReason::MissingImageUrl));
        };
        tracing::Span::current().record("image_url", url.as_str());

        let identification = self.identify(&url).await?;
        let resolution = identification.resolution;
        if resolution.category == Category::Unknown {
            tracing::debug!(
                "No cat or dog among {:?}",
                identification
                    .predictions
                    .iter()
                    .map(|p| p.label.as_str())
                    .collect::<Vec<_>>()
            );
            return Ok(Outcome::Skipped(SkipReason::Unrecognized));
        }

        let data = event.data.unwrap_or_default();
        let outbound =
            OutboundEvent::from_inbound(&data, &resolution, self.variant.include_sub_label);
        let payload = outbound.to_vec().map_err(|e| BrokerError::Publish {
            queue: self.variant.output_queue.clone(),
            message: format!("Failed to serialize result: {e}"),
        })?;

        self.broker
            .publish(&self.variant.output_queue, &payload)
            .await?;
        Ok(Outcome::Published(outbound))
    }

    /// Fetch, classify, and resolve a single image URL.
    pub async fn identify(&self, url: &str) -> PipelineResult<Identification> {
        identify(self.fetcher.as_ref(), &self.classifier, url).await
    }
}

/// Fetch, classify, and resolve a single image URL without a broker.
///
/// Preprocessing and inference run on the blocking pool and are awaited
/// before returning.
pub async fn identify(
    fetcher: &dyn ImageSource,
    classifier: &Arc<dyn ImageClassifier>,
    url: &str,
) -> PipelineResult<Identification> {
    let decoded = fetcher.fetch(url).await?;
    tracing::debug!(
        "Fetched {} {}x{} image ({} bytes)",
        format_to_string(decoded.format),
        decoded.width,
        decoded.height,
        decoded.byte_len
    );

    let classifier = Arc::clone(classifier);
    let image = decoded.image;
    let predictions = tokio::task::spawn_blocking(move || classifier.classify_image(&image))
        .await
        .map_err(|e| PipelineError::Inference(format!("Task join error: {e}")))??;

    let resolution = resolve(&predictions);
    Ok(Identification {
        url: url.to_string(),
        resolution,
        predictions,
    })
}
