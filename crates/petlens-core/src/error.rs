//! Error types for the PetLens worker.
//!
//! Startup and run-loop faults surface as [`WorkerError`] and stop the
//! process. Everything that can go wrong while handling a single message is a
//! [`PipelineError`], which the worker logs and acknowledges instead of
//! propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for PetLens operations.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Broker connection or channel errors
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Model loading errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// The HTTP client could not be built from `[fetch]` settings
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while loading the classification model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Model or label file is missing on disk
    #[error("Model file not found: {0}")]
    NotFound(PathBuf),

    /// ONNX Runtime refused the model
    #[error("Failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// Label file is unreadable or empty
    #[error("Invalid label file {path}: {message}")]
    Labels { path: PathBuf, message: String },
}

/// Broker connection, declaration, and acknowledgment errors.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Could not open a connection or channel
    #[error("Failed to connect to broker: {0}")]
    Connect(String),

    /// Queue declaration or consumer setup failed
    #[error("Failed to set up queue {queue}: {message}")]
    Setup { queue: String, message: String },

    /// The consumer stream ended or yielded an error
    #[error("Consumer error: {0}")]
    Consume(String),

    /// Acknowledgment could not be delivered
    #[error("Failed to ack delivery {delivery_tag}: {message}")]
    Ack { delivery_tag: u64, message: String },

    /// Publish was rejected or the confirm failed
    #[error("Failed to publish to {queue}: {message}")]
    Publish { queue: String, message: String },
}

/// Per-message pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Message body is not valid JSON for the inbound contract
    #[error("Malformed message body: {0}")]
    Parse(String),

    /// A required field is present but unusable
    #[error("Invalid message: {0}")]
    Validation(String),

    /// Image could not be retrieved
    #[error("Fetch failed for {url}: {message}")]
    Fetch {
        url: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Retrieved bytes are not a decodable image
    #[error("Decode error for {url}: {message}")]
    Decode { url: String, message: String },

    /// Model invocation failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Result could not be published downstream
    #[error("Publish failed: {0}")]
    Publish(#[from] BrokerError),
}

impl PipelineError {
    /// Short stage name used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Validation(_) => "validate",
            Self::Fetch { .. } => "fetch",
            Self::Decode { .. } => "decode",
            Self::Inference(_) => "inference",
            Self::Publish(_) => "publish",
        }
    }
}

/// Convenience type alias for PetLens results.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineError::Parse("x".into()).stage(), "parse");
        assert_eq!(
            PipelineError::Fetch {
                url: "http://x/cat.jpg".into(),
                message: "refused".into(),
                status_code: None,
            }
            .stage(),
            "fetch"
        );
        assert_eq!(PipelineError::Inference("boom".into()).stage(), "inference");
    }

    #[test]
    fn test_fetch_error_message_includes_url() {
        let err = PipelineError::Fetch {
            url: "http://x/cat.jpg".into(),
            message: "HTTP 404 Not Found".into(),
            status_code: Some(404),
        };
        let msg = err.to_string();
        assert!(msg.contains("http://x/cat.jpg"));
        assert!(msg.contains("404"));
    }
}
