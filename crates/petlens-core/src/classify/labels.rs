//! Class label file loading.
//!
//! One label per line, in model output order. Blank lines and surrounding
//! whitespace are ignored.

use std::path::Path;

use crate::error::ModelError;

/// Ordered class labels for a classification model.
#[derive(Debug, Clone)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Load labels from a text file.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::Labels {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let set = Self::parse(&content);
        if set.is_empty() {
            return Err(ModelError::Labels {
                path: path.to_path_buf(),
                message: "no labels found".to_string(),
            });
        }
        Ok(set)
    }

    /// Parse labels from text content.
    pub fn parse(content: &str) -> Self {
        let labels = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Offset to subtract from a model output index to get a label index.
    ///
    /// Models exported with a background class emit `len() + 1` scores with
    /// the background at index 0. Returns `None` for any other mismatch.
    pub fn output_offset(&self, score_count: usize) -> Option<usize> {
        if score_count == self.len() {
            Some(0)
        } else if score_count == self.len() + 1 {
            Some(1)
        } else {
            None
        }
    }
}
