//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.uri.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "broker.uri must not be empty".into(),
            ));
        }
        if self.broker.input_queue.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "broker.input_queue must not be empty".into(),
            ));
        }
        if self.variant.output_queue.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "variant.output_queue must not be empty".into(),
            ));
        }
        if self.broker.input_queue == self.variant.output_queue {
            return Err(ConfigError::ValidationError(
                "variant.output_queue must differ from broker.input_queue".into(),
            ));
        }
        if self.broker.prefetch == 0 {
            return Err(ConfigError::ValidationError(
                "broker.prefetch must be > 0".into(),
            ));
        }
        if self.model.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.image_size must be > 0".into(),
            ));
        }
        if self.model.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "model.top_k must be > 0".into(),
            ));
        }
        if self.fetch.timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "fetch.timeout_ms must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_uri() {
        let mut config = Config::default();
        config.broker.uri = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("broker.uri"));
    }

    #[test]
    fn test_validate_rejects_same_input_and_output_queue() {
        let mut config = Config::default();
        config.variant.output_queue = config.broker.input_queue.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_queue"));
    }

    #[test]
    fn test_validate_rejects_zero_prefetch() {
        let mut config = Config::default();
        config.broker.prefetch = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("prefetch"));
    }

    #[test]
    fn test_validate_rejects_zero_image_size() {
        let mut config = Config::default();
        config.model.image_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("image_size"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.fetch.timeout_ms = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));

        config.fetch.timeout_ms = Some(10_000);
        assert!(config.validate().is_ok());
    }
}
