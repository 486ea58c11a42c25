//! Pretrained image classification.
//!
//! This module turns a decoded image into a ranked list of labelled
//! predictions using an ImageNet-style classifier (MobileNetV2 by default)
//! running locally via ONNX Runtime.
//!
//! # Usage
//!
//! ```rust,ignore
//! use petlens_core::classify::{ImageClassifier, OnnxClassifier};
//! use petlens_core::Config;
//!
//! let config = Config::default();
//! let classifier = OnnxClassifier::load(&config)?;
//! let predictions = classifier.classify_image(&decoded.image)?;
//! // predictions holds up to `top_k` (label, confidence) pairs, best first
//! ```

pub(crate) mod labels;
pub(crate) mod preprocess;
pub(crate) mod session;

use image::DynamicImage;
use ndarray::Array4;

use crate::config::{Config, ModelOutput};
use crate::error::{ModelError, PipelineError};
use crate::math;
use crate::types::Prediction;

pub use self::labels::LabelSet;
pub use self::preprocess::{preprocess, InputSpec};
use self::session::ClassifierSession;

/// A loaded, read-only image classifier.
///
/// Implementations must be safe to share across the worker's blocking tasks.
pub trait ImageClassifier: Send + Sync {
    /// Input tensor shape this classifier expects.
    fn input_spec(&self) -> InputSpec;

    /// Rank a preprocessed tensor, best prediction first.
    fn classify(&self, tensor: &Array4<f32>) -> Result<Vec<Prediction>, PipelineError>;

    /// Preprocess and rank a decoded image.
    fn classify_image(&self, image: &DynamicImage) -> Result<Vec<Prediction>, PipelineError> {
        let tensor = preprocess(image, self.input_spec());
        self.classify(&tensor)
    }
}

/// Classifier backed by an ONNX model and a label file.
pub struct OnnxClassifier {
    session: ClassifierSession,
    labels: LabelSet,
    input: InputSpec,
    output: ModelOutput,
    top_k: usize,
}

impl OnnxClassifier {
    /// Load the model and labels named by `config.model`.
    ///
    /// Expects both files under the configured model directory.
    pub fn load(config: &Config) -> Result<Self, ModelError> {
        let model_path = config.model_path();
        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path));
        }
        let labels = LabelSet::load(&config.labels_path())?;

        tracing::info!("Loading classifier from {:?}", model_path);
        let session = ClassifierSession::load(&model_path)?;
        tracing::info!("Classifier loaded ({} labels)", labels.len());

        Ok(Self {
            session,
            labels,
            input: InputSpec {
                image_size: config.model.image_size,
                layout: config.model.layout,
            },
            output: config.model.output,
            top_k: config.model.top_k,
        })
    }

    /// Check whether the model and label files exist on disk.
    pub fn model_exists(config: &Config) -> bool {
        config.model_path().exists() && config.labels_path().exists()
    }
}

impl ImageClassifier for OnnxClassifier {
    fn input_spec(&self) -> InputSpec {
        self.input
    }

    fn classify(&self, tensor: &Array4<f32>) -> Result<Vec<Prediction>, PipelineError> {
        let scores = self.session.scores(tensor)?;
        rank(&scores, &self.labels, self.output, self.top_k)
    }
}

/// Turn a raw score vector into the top `k` labelled predictions.
///
/// A leading background class (one score more than there are labels) is
/// dropped before ranking.
pub fn rank(
    scores: &[f32],
    labels: &LabelSet,
    output: ModelOutput,
    k: usize,
) -> Result<Vec<Prediction>, PipelineError> {
    let offset = labels.output_offset(scores.len()).ok_or_else(|| {
        PipelineError::Inference(format!(
            "Model produced {} scores but label file has {} labels",
            scores.len(),
            labels.len()
        ))
    })?;

    let probabilities = match output {
        ModelOutput::Probabilities => scores.to_vec(),
        ModelOutput::Logits => math::softmax(scores),
    };

    math::top_k(&probabilities[offset..], k)
        .into_iter()
        .map(|(idx, confidence)| {
            labels
                .get(idx)
                .map(|label| Prediction::new(label, confidence))
                .ok_or_else(|| PipelineError::Inference(format!("No label for class {idx}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> LabelSet {
        LabelSet::parse("goldfish\ntabby_cat\nbeagle\ntrout\ncoral\nhamster\n")
    }

    #[test]
    fn test_rank_probabilities() {
        let scores = [0.05, 0.6, 0.2, 0.05, 0.05, 0.05];
        let preds = rank(&scores, &labels(), ModelOutput::Probabilities, 2).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[0].label, "tabby_cat");
        assert_eq!(preds[1].label, "beagle");
        assert!(preds[0].confidence > preds[1].confidence);
    }

    #[test]
    fn test_rank_skips_background_class() {
        // Index 0 is background and outscores everything
        let scores = [0.9, 0.01, 0.02, 0.05, 0.01, 0.005, 0.005];
        let preds = rank(&scores, &labels(), ModelOutput::Probabilities, 1).unwrap();
        assert_eq!(preds[0].label, "beagle");
    }

    #[test]
    fn test_rank_applies_softmax_to_logits() {
        let scores = [0.0, 5.0, 1.0, 0.0, 0.0, 0.0];
        let preds = rank(&scores, &labels(), ModelOutput::Logits, 6).unwrap();
        let sum: f32 = preds.iter().map(|p| p.confidence).sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(preds[0].label, "tabby_cat");
    }

    #[test]
    fn test_rank_rejects_label_mismatch() {
        let err = rank(&[0.5, 0.5], &labels(), ModelOutput::Probabilities, 5).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(_)));
    }

    #[test]
    fn test_default_top_k_is_five() {
        let scores = [0.1, 0.2, 0.3, 0.15, 0.15, 0.1];
        let preds = rank(&scores, &labels(), ModelOutput::Probabilities, 5).unwrap();
        assert_eq!(preds.len(), 5);
        assert!(preds.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_load_reports_missing_model() {
        let mut config = Config::default();
        config.model.model_dir = std::path::PathBuf::from("/definitely/not/here");
        assert!(!OnnxClassifier::model_exists(&config));
        let err = OnnxClassifier::load(&config).err().unwrap();
        assert!(matches!(err, ModelError::NotFound(_)));
    }
}
