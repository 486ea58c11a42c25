//! Core data types for the PetLens message contract.
//!
//! Inbound and outbound events use camelCase on the wire. Pass-through fields
//! (`petId`, `userId`, `name`) are arbitrary JSON values and are never
//! type-checked; only `imageUrl` has to be usable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PipelineError;

/// Notification that an image was uploaded (`image.uploaded`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Event payload; absent payloads are skipped, not rejected
    #[serde(default)]
    pub data: Option<InboundData>,
}

/// Payload of an [`InboundEvent`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundData {
    /// Where to fetch the image from; checked by [`InboundEvent::image_url`]
    #[serde(default)]
    pub image_url: Option<Value>,

    #[serde(default)]
    pub pet_id: Option<Value>,

    #[serde(default)]
    pub user_id: Option<Value>,

    #[serde(default)]
    pub name: Option<Value>,
}

impl InboundEvent {
    /// Parse a raw message body.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// The image URL, if the payload carries a non-empty one.
    ///
    /// A missing, `null`, or blank `imageUrl` is `Ok(None)` and the message is
    /// skipped; a blank URL is never fetched. Any other non-string value is a
    /// [`PipelineError::Validation`].
    pub fn image_url(&self) -> Result<Option<&str>, PipelineError> {
        match self.data.as_ref().and_then(|d| d.image_url.as_ref()) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(url)) if url.trim().is_empty() => Ok(None),
            Some(Value::String(url)) => Ok(Some(url.as_str())),
            Some(other) => Err(PipelineError::Validation(format!(
                "data.imageUrl must be a string, got {other}"
            ))),
        }
    }
}

/// A single ranked model prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Class label as spelled by the model's label file
    pub label: String,

    /// Model-reported score; not a calibrated probability
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Controlled vocabulary the worker publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cat,
    Dog,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cat => "cat",
            Self::Dog => "dog",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a ranked prediction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub category: Category,

    /// Breed/variety proxy; only set for `cat` and `dog`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_label: Option<String>,
}

impl Resolution {
    pub fn unknown() -> Self {
        Self {
            category: Category::Unknown,
            sub_label: None,
        }
    }
}

/// Result published to the output queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_id: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Resolved category (`cat` or `dog`)
    #[serde(rename = "type")]
    pub kind: Category,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
}

impl OutboundEvent {
    /// Build the outbound event, carrying identity fields through unchanged.
    ///
    /// `breed` is only attached when `include_sub_label` is set.
    pub fn from_inbound(
        data: &InboundData,
        resolution: &Resolution,
        include_sub_label: bool,
    ) -> Self {
        Self {
            pet_id: data.pet_id.clone(),
            user_id: data.user_id.clone(),
            name: data.name.clone(),
            image_url: data
                .image_url
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string),
            kind: resolution.category,
            breed: if include_sub_label {
                resolution.sub_label.clone()
            } else {
                None
            },
        }
    }

    /// Serialize for publishing.
    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
