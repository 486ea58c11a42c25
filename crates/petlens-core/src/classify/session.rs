//! ONNX Runtime session management for the image classifier.
//!
//! Loads a classification model exported to ONNX and returns the raw score
//! vector for a single preprocessed image.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::{ModelError, PipelineError};

/// Wraps an ONNX Runtime session for single-image classification.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`. The worker
/// handles one message at a time, so the lock is never contended.
pub struct ClassifierSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
}

impl ClassifierSession {
    /// Load a classifier from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(|e| ModelError::Load {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| ModelError::Load {
                path: model_path.to_path_buf(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "input".to_string());

        tracing::debug!(
            "Loaded classifier from {:?} (input: {:?}, outputs: {:?})",
            model_path,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }

    /// Run inference and return the flat score vector of the first output.
    ///
    /// Input shape: `[1, H, W, 3]` or `[1, 3, H, W]`, scaled to [0, 1].
    /// Output: one score per class (`[1, N]` or `[N]`).
    pub fn scores(&self, preprocessed: &Array4<f32>) -> Result<Vec<f32>, PipelineError> {
        let shape: Vec<i64> = preprocessed.shape().iter().map(|&d| d as i64).collect();
        let flat_data: Vec<f32> = preprocessed.iter().copied().collect();

        let input_value = Value::from_array((shape, flat_data))
            .map_err(|e| PipelineError::Inference(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self
            .session
            .lock()
            .map_err(|e| PipelineError::Inference(format!("Session lock poisoned: {e}")))?;

        let outputs = session
            .run(inputs)
            .map_err(|e| PipelineError::Inference(format!("ONNX inference failed: {e}")))?;

        let (_, first) = outputs
            .iter()
            .next()
            .ok_or_else(|| PipelineError::Inference("Model produced no outputs".to_string()))?;

        let (shape, data) = first.try_extract_tensor::<f32>().map_err(|e| {
            PipelineError::Inference(format!("Failed to extract output tensor: {e}"))
        })?;

        match shape.len() {
            1 => Ok(data.to_vec()),
            2 if shape[0] == 1 => Ok(data.to_vec()),
            _ => Err(PipelineError::Inference(format!(
                "Unexpected output shape: {:?}",
                shape
            ))),
        }
    }
}
