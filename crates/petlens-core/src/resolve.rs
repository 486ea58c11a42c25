//! Maps ranked model predictions onto the `cat` / `dog` / `unknown` vocabulary.
//!
//! Every label in the ranked list is lower-cased and checked for the `"cat"`
//! keyword, then for `"dog"`. The whole list is searched, not just the top-1
//! prediction, so a cat ranked fifth still wins over a dog ranked first. The
//! top-ranked label is kept as the sub-label (used as a breed proxy).

use crate::types::{Category, Prediction, Resolution};

const CAT_KEYWORD: &str = "cat";
const DOG_KEYWORD: &str = "dog";

/// Resolve a ranked prediction list to a category and optional sub-label.
pub fn resolve(predictions: &[Prediction]) -> Resolution {
    let labels: Vec<String> = predictions.iter().map(|p| p.label.to_lowercase()).collect();

    let category = if labels.iter().any(|l| l.contains(CAT_KEYWORD)) {
        Category::Cat
    } else if labels.iter().any(|l| l.contains(DOG_KEYWORD)) {
        Category::Dog
    } else {
        return Resolution::unknown();
    };

    Resolution {
        category,
        sub_label: predictions.first().map(|p| p.label.clone()),
    }
}
