//! Terminal outcomes of a single message and the ack policy applied to them.

use crate::error::PipelineError;
use crate::types::OutboundEvent;

/// Why a message was consumed without publishing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No `data`, or `data.imageUrl` missing, null, or blank
    MissingImageUrl,
    /// Classification matched neither cat nor dog
    Unrecognized,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingImageUrl => "missing_image_url",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// How handling one message ended.
#[derive(Debug)]
pub enum Outcome {
    /// Result published downstream
    Published(OutboundEvent),
    /// Consumed with nothing to publish
    Skipped(SkipReason),
    /// A pipeline stage failed
    Failed(PipelineError),
}

/// What to tell the broker about a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Remove the message from the queue
    Ack,
    /// Put the message back for another attempt
    Requeue,
}

impl Outcome {
    /// The delivery policy.
    ///
    /// Every outcome is acknowledged, failures included: a message this
    /// worker has seen is never redelivered, and there is no dead-letter
    /// queue. Transient fetch failures therefore lose the event.
    pub fn disposition(&self) -> Disposition {
        match self {
            Outcome::Published(_) => Disposition::Ack,
            Outcome::Skipped(_) => Disposition::Ack,
            Outcome::Failed(_) => Disposition::Ack,
        }
    }

    /// Short label for logs and stats.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Published(_) => "published",
            Outcome::Skipped(_) => "skipped",
            Outcome::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_outcome_is_acked() {
        let outcomes = [
            Outcome::Skipped(SkipReason::MissingImageUrl),
            Outcome::Skipped(SkipReason::Unrecognized),
            Outcome::Failed(PipelineError::Inference("boom".into())),
            Outcome::Failed(PipelineError::Parse("bad json".into())),
        ];
        for outcome in &outcomes {
            assert_eq!(outcome.disposition(), Disposition::Ack, "{outcome:?}");
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(Outcome::Skipped(SkipReason::Unrecognized).label(), "skipped");
        assert_eq!(SkipReason::MissingImageUrl.as_str(), "missing_image_url");
    }
}
