//! Feedback records emitted when a decision reaches a terminal outcome.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::action::Fingerprint;
use crate::types::{CriticalityTier, Timestamp};

/// How an action ultimately resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// A human approved it.
    Approved,
    /// A human denied it.
    Denied,
    /// No one answered before the channel ladder was exhausted.
    ///
    /// Reported distinctly from [`Self::Denied`]: "no one answered" is
    /// never "a human said no".
    Expired,
    /// Executed without human involvement.
    Auto,
}

impl FeedbackOutcome {
    /// Whether a human made this decision.
    #[must_use]
    pub fn is_human(self) -> bool {
        !matches!(self, Self::Auto)
    }

    /// Stable string form used in logs and persisted records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for FeedbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only feedback record; never mutated after write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Coarse key aggregating similar actions.
    pub fingerprint: Fingerprint,
    /// The tier the action was classified into.
    pub criticality: CriticalityTier,
    /// How it resolved.
    pub outcome: FeedbackOutcome,
    /// Time from request creation to resolution, when a human responded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_latency_ms: Option<u64>,
    /// When the resolution happened.
    pub timestamp: Timestamp,
}

impl FeedbackRecord {
    /// Create a record resolved now.
    #[must_use]
    pub fn new(
        fingerprint: Fingerprint,
        criticality: CriticalityTier,
        outcome: FeedbackOutcome,
        response_latency_ms: Option<u64>,
    ) -> Self {
        Self {
            fingerprint,
            criticality,
            outcome,
            response_latency_ms,
            timestamp: Timestamp::now(),
        }
    }
}
