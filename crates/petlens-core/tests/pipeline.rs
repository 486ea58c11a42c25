//! End-to-end worker tests against an in-memory broker, a canned image
//! source, and a scripted classifier.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use ndarray::Array4;
use serde_json::{json, Value};

use petlens_core::classify::InputSpec;
use petlens_core::config::TensorLayout;
use petlens_core::{
    Broker, DecodedImage, ImageClassifier, ImageSource, MemoryBroker, Outcome, PipelineError,
    Prediction, SkipReason, StopReason, VariantConfig, Worker,
};

/// Serves a blank image for known URLs and a fetch error for everything else.
#[derive(Default)]
struct FakeFetcher {
    known: Vec<String>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ImageSource for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<DecodedImage, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.known.iter().any(|k| k == url) {
            return Err(PipelineError::Fetch {
                url: url.to_string(),
                message: "connection refused".to_string(),
                status_code: None,
            });
        }
        let image = DynamicImage::ImageRgb8(RgbImage::new(32, 24));
        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format: ImageFormat::Png,
            width,
            height,
            byte_len: 0,
        })
    }
}

/// Returns the same ranked labels for every image.
struct ScriptedClassifier {
    labels: Vec<&'static str>,
    calls: Arc<AtomicUsize>,
}

impl ImageClassifier for ScriptedClassifier {
    fn input_spec(&self) -> InputSpec {
        InputSpec {
            image_size: 8,
            layout: TensorLayout::Nhwc,
        }
    }

    fn classify(&self, tensor: &Array4<f32>) -> Result<Vec<Prediction>, PipelineError> {
        assert_eq!(tensor.shape(), &[1, 8, 8, 3]);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .labels
            .iter()
            .enumerate()
            .map(|(i, l)| Prediction::new(*l, 0.9 - i as f32 * 0.1))
            .collect())
    }
}

struct FailingClassifier;

impl ImageClassifier for FailingClassifier {
    fn input_spec(&self) -> InputSpec {
        InputSpec {
            image_size: 8,
            layout: TensorLayout::Nchw,
        }
    }

    fn classify(&self, _tensor: &Array4<f32>) -> Result<Vec<Prediction>, PipelineError> {
        Err(PipelineError::Inference("session crashed".to_string()))
    }
}

struct Harness {
    broker: Arc<MemoryBroker>,
    worker: Worker,
    fetch_calls: Arc<AtomicUsize>,
    classify_calls: Arc<AtomicUsize>,
}

fn harness(labels: Vec<&'static str>, variant: VariantConfig) -> Harness {
    let broker = Arc::new(MemoryBroker::new());
    let fetch_calls = Arc::new(AtomicUsize::new(0));
    let classify_calls = Arc::new(AtomicUsize::new(0));
    let fetcher = FakeFetcher {
        known: vec![
            "http://x/cat.jpg".to_string(),
            "http://x/dog.jpg".to_string(),
            "http://x/fish.jpg".to_string(),
        ],
        calls: Arc::clone(&fetch_calls),
    };
    let classifier = ScriptedClassifier {
        labels,
        calls: Arc::clone(&classify_calls),
    };
    let worker = Worker::new(
        broker.clone(),
        Box::new(fetcher),
        Arc::new(classifier),
        variant,
    );
    Harness {
        broker,
        worker,
        fetch_calls,
        classify_calls,
    }
}

fn published_json(broker: &MemoryBroker) -> Vec<(String, Value)> {
    broker
        .published()
        .into_iter()
        .map(|p| (p.queue, serde_json::from_slice(&p.body).unwrap()))
        .collect()
}

async fn drain(h: &mut Harness) {
    let summary = h.worker.run_until(std::future::pending()).await.unwrap();
    assert_eq!(summary.reason, StopReason::ConsumerClosed);
}

#[tokio::test]
async fn scenario_a_cat_is_published_and_acked() {
    let mut h = harness(
        vec!["tabby_cat", "tiger_cat", "Egyptian_cat"],
        VariantConfig::animal(),
    );
    let tag = h
        .broker
        .push(r#"{"data":{"imageUrl":"http://x/cat.jpg","petId":1,"userId":2}}"#);

    drain(&mut h).await;

    let published = published_json(&h.broker);
    assert_eq!(published.len(), 1);
    let (queue, body) = &published[0];
    assert_eq!(queue, "animal.identified");
    assert_eq!(body["petId"], json!(1));
    assert_eq!(body["userId"], json!(2));
    assert_eq!(body["type"], json!("cat"));
    assert!(body.get("breed").is_none());
    assert_eq!(h.broker.acked(), vec![tag]);
}

#[tokio::test]
async fn scenario_b_unfetchable_url_is_acked_without_publish() {
    let mut h = harness(vec!["tabby_cat"], VariantConfig::animal());
    let tag = h
        .broker
        .push(r#"{"data":{"imageUrl":"http://unreachable.invalid/cat.jpg","petId":1}}"#);

    drain(&mut h).await;

    assert!(h.broker.published().is_empty());
    assert_eq!(h.broker.acked(), vec![tag]);
    assert_eq!(h.fetch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.classify_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.worker.stats().failed, 1);
}

#[tokio::test]
async fn scenario_c_no_match_is_skipped() {
    let mut h = harness(vec!["goldfish", "trout", "coral"], VariantConfig::animal());
    let tag = h.broker.push(r#"{"data":{"imageUrl":"http://x/fish.jpg"}}"#);

    drain(&mut h).await;

    assert!(h.broker.published().is_empty());
    assert_eq!(h.broker.acked(), vec![tag]);
    assert_eq!(h.worker.stats().skipped, 1);
}

#[tokio::test]
async fn scenario_d_missing_image_url_skips_all_stages() {
    let mut h = harness(vec!["tabby_cat"], VariantConfig::animal());
    let no_url = h.broker.push(r#"{"data":{"petId":1,"userId":2}}"#);
    let no_data = h.broker.push(r#"{"petId":1}"#);

    drain(&mut h).await;

    assert!(h.broker.published().is_empty());
    assert_eq!(h.broker.acked(), vec![no_url, no_data]);
    assert_eq!(h.fetch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.classify_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cat_anywhere_in_top_five_beats_dog() {
    let h = harness(
        vec!["Eskimo_dog", "malamute", "Siberian_husky", "dogsled", "tiger_cat"],
        VariantConfig::pet(),
    );

    let outcome = h
        .worker
        .handle(br#"{"data":{"imageUrl":"http://x/dog.jpg","name":"Mishka"}}"#)
        .await;

    match outcome {
        Outcome::Published(event) => {
            assert_eq!(event.kind, petlens_core::Category::Cat);
            assert_eq!(event.breed.as_deref(), Some("Eskimo_dog"));
            assert_eq!(event.name, Some(json!("Mishka")));
        }
        other => panic!("expected publish, got {other:?}"),
    }
}

#[tokio::test]
async fn pet_variant_publishes_breed_and_passthrough_fields() {
    let mut h = harness(
        vec!["Labrador_retriever", "hotdog", "kuvasz"],
        VariantConfig::pet(),
    );
    h.broker.push(
        r#"{"data":{"imageUrl":"http://x/dog.jpg","petId":"p-9","userId":"u-3","name":"Rex"}}"#,
    );

    drain(&mut h).await;

    let published = published_json(&h.broker);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "pet.identified");
    assert_eq!(
        published[0].1,
        json!({
            "petId": "p-9",
            "userId": "u-3",
            "name": "Rex",
            "imageUrl": "http://x/dog.jpg",
            "type": "dog",
            "breed": "Labrador_retriever"
        })
    );
}

#[tokio::test]
async fn non_string_name_is_passed_through_unchanged() {
    let mut h = harness(vec!["tabby_cat"], VariantConfig::animal());
    let tag = h
        .broker
        .push(r#"{"data":{"imageUrl":"http://x/cat.jpg","petId":1,"name":42}}"#);

    drain(&mut h).await;

    let published = published_json(&h.broker);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1["name"], json!(42));
    assert_eq!(published[0].1["type"], json!("cat"));
    assert_eq!(h.broker.acked(), vec![tag]);
}

#[tokio::test]
async fn non_string_image_url_fails_validation_without_fetching() {
    let h = harness(vec!["tabby_cat"], VariantConfig::animal());

    let outcome = h.worker.handle(br#"{"data":{"imageUrl":{"href":"x"}}}"#).await;

    match outcome {
        Outcome::Failed(e) => assert_eq!(e.stage(), "validate"),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert_eq!(h.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_body_is_acked_as_failure() {
    let mut h = harness(vec!["tabby_cat"], VariantConfig::animal());
    let tag = h.broker.push("this is not json");

    drain(&mut h).await;

    assert!(h.broker.published().is_empty());
    assert_eq!(h.broker.acked(), vec![tag]);
    assert_eq!(h.worker.stats().failed, 1);
    assert_eq!(h.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn inference_failure_is_acked() {
    let broker = Arc::new(MemoryBroker::new());
    let fetcher = FakeFetcher {
        known: vec!["http://x/cat.jpg".to_string()],
        ..Default::default()
    };
    let mut worker = Worker::new(
        broker.clone(),
        Box::new(fetcher),
        Arc::new(FailingClassifier),
        VariantConfig::animal(),
    );
    let tag = broker.push(r#"{"data":{"imageUrl":"http://x/cat.jpg"}}"#);

    let summary = worker.run_until(std::future::pending()).await.unwrap();

    assert_eq!(summary.stats.failed, 1);
    assert!(broker.published().is_empty());
    assert_eq!(broker.acked(), vec![tag]);
}

#[tokio::test]
async fn publish_failure_is_acked_and_not_retried() {
    let mut h = harness(vec!["Persian_cat"], VariantConfig::animal());
    h.broker.fail_publishes(true);
    let tag = h.broker.push(r#"{"data":{"imageUrl":"http://x/cat.jpg"}}"#);

    drain(&mut h).await;

    assert_eq!(h.broker.acked(), vec![tag]);
    assert!(h.broker.requeued().is_empty());
    assert_eq!(h.worker.stats().failed, 1);
}

#[tokio::test]
async fn every_message_acked_exactly_once_in_order() {
    let mut h = harness(vec!["Siamese_cat"], VariantConfig::animal());
    let tags: Vec<u64> = [
        r#"{"data":{"imageUrl":"http://x/cat.jpg"}}"#,
        r#"{"data":{}}"#,
        "garbage",
        r#"{"data":{"imageUrl":"http://nowhere/x.jpg"}}"#,
        r#"{"data":{"imageUrl":"http://x/cat.jpg","petId":5}}"#,
    ]
    .into_iter()
    .map(|body| h.broker.push(body))
    .collect();

    drain(&mut h).await;

    assert_eq!(h.broker.acked(), tags);
    let stats = h.worker.stats();
    assert_eq!(stats.received, 5);
    assert_eq!(stats.published, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.failed, 2);
    assert!(h.broker.is_closed());
}

#[tokio::test]
async fn shutdown_stops_before_next_message_and_closes_broker() {
    let mut h = harness(vec!["tabby_cat"], VariantConfig::animal());
    h.broker.push(r#"{"data":{"imageUrl":"http://x/cat.jpg"}}"#);

    let summary = h.worker.run_until(async {}).await.unwrap();

    assert_eq!(summary.reason, StopReason::Shutdown);
    assert_eq!(summary.stats.received, 0);
    assert_eq!(h.broker.pending(), 1);
    assert!(h.broker.is_closed());
}

#[tokio::test]
async fn identify_reports_predictions() {
    let h = harness(vec!["Egyptian_cat", "lynx"], VariantConfig::animal());
    let id = h.worker.identify("http://x/cat.jpg").await.unwrap();
    assert_eq!(id.resolution.category, petlens_core::Category::Cat);
    assert_eq!(id.resolution.sub_label.as_deref(), Some("Egyptian_cat"));
    assert_eq!(id.predictions.len(), 2);

    let value = serde_json::to_value(&id).unwrap();
    assert_eq!(value["category"], "cat");
    assert_eq!(value["url"], "http://x/cat.jpg");
}

#[tokio::test]
async fn skip_reason_is_reported() {
    let h = harness(vec!["tabby_cat"], VariantConfig::animal());
    let outcome = h.worker.handle(br#"{"data":{"imageUrl":""}}"#).await;
    assert!(matches!(
        outcome,
        Outcome::Skipped(SkipReason::MissingImageUrl)
    ));

    let broker_name = {
        let b: Arc<dyn Broker> = h.broker.clone();
        b.name().to_string()
    };
    assert_eq!(broker_name, "memory");
}
