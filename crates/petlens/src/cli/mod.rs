pub mod classify;
pub mod config;
pub mod run;

use std::sync::Arc;

use anyhow::Context;
use petlens_core::{Config, ImageClassifier, OnnxClassifier};

/// Load the configured classifier, or explain where the files should be.
pub(crate) fn load_classifier(config: &Config) -> anyhow::Result<Arc<dyn ImageClassifier>> {
    if !OnnxClassifier::model_exists(config) {
        anyhow::bail!(
            "Model files not found. Expected {} and {}.\n\
             Set [model] model_dir in the config file (see `petlens config path`).",
            config.model_path().display(),
            config.labels_path().display()
        );
    }

    let classifier = OnnxClassifier::load(config)
        .with_context(|| format!("Model directory: {}", config.model_dir().display()))?;
    tracing::info!(
        "Loaded model {} ({}x{})",
        config.model.model_file,
        config.model.image_size,
        config.model.image_size
    );
    Ok(Arc::new(classifier))
}
