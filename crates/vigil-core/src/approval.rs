//! Approval request lifecycle state and transition validation.
//!
//! The engine owns the state machine; this module provides the tracked
//! lifecycle object and rejects transitions the machine does not allow:
//!
//! ```text
//! PENDING   --timeout, channels remain--> ESCALATED
//! PENDING   --timeout, none remain-----> EXPIRED      [terminal]
//! PENDING   --approve----------------->  APPROVED     [terminal]
//! PENDING   --deny-------------------->  DENIED       [terminal]
//! PENDING   --defer------------------->  DEFERRED --reschedule--> PENDING
//! DEFERRED  --early response---------->  APPROVED | DENIED
//! ESCALATED --response---------------->  APPROVED | DENIED | DEFERRED
//! ESCALATED --exhaustion-------------->  EXPIRED      [terminal]
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::action::ActionRequest;
use crate::types::{ChannelKind, CriticalityTier, RequestId, Timestamp};

/// Status of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a human response on the first channel.
    Pending,
    /// A human approved the action.
    Approved,
    /// A human denied the action.
    Denied,
    /// A human postponed the decision; transient on the way back to pending.
    Deferred,
    /// The first channel window elapsed; alerting moved down the ladder.
    Escalated,
    /// Every channel was exhausted without a response.
    Expired,
}

impl ApprovalStatus {
    /// Terminal statuses never transition again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Denied | Self::Expired)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(
                next,
                Self::Approved | Self::Denied | Self::Deferred | Self::Escalated | Self::Expired
            ),
            Self::Escalated => {
                matches!(next, Self::Approved | Self::Denied | Self::Deferred | Self::Expired)
            },
            // A human who deferred may still come back and decide early.
            Self::Deferred => matches!(next, Self::Pending | Self::Approved | Self::Denied),
            Self::Approved | Self::Denied | Self::Expired => false,
        }
    }

    /// Stable string form used in logs and persisted records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Deferred => "deferred",
            Self::Escalated => "escalated",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition was attempted that the state machine does not allow.
///
/// Raised for late or duplicate resolutions (a race or a stale client);
/// callers log it rather than silently dropping the attempt.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid transition for {id}: {from} -> {to}")]
pub struct InvalidTransition {
    /// The request the transition was attempted on.
    pub id: RequestId,
    /// Status at the time of the attempt.
    pub from: ApprovalStatus,
    /// The rejected target status.
    pub to: ApprovalStatus,
}

/// Outcome of one alert attempt on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AttemptOutcome {
    /// The provider accepted the alert.
    Delivered,
    /// The provider was unreachable or rejected the alert.
    ///
    /// Equivalent to a timeout for escalation purposes, but tagged
    /// distinctly for diagnostics.
    Failed {
        /// Provider-supplied failure detail.
        reason: String,
    },
    /// The provider call did not acknowledge within its timeout.
    TimedOut,
}

impl AttemptOutcome {
    /// Whether the alert reached the provider.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// One entry in an approval request's channel log.
///
/// Entries for a single request are strictly time-ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttempt {
    /// The channel the alert went out on.
    pub channel: ChannelKind,
    /// When the attempt was made.
    pub attempted_at: Timestamp,
    /// What happened.
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// The tracked lifecycle object for one pending human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Identifier, shared with the underlying action.
    pub id: RequestId,
    /// The action awaiting sign-off.
    pub action: ActionRequest,
    /// Criticality tier driving timeout and escalation policy.
    pub criticality: CriticalityTier,
    /// When the approval request was opened.
    pub created_at: Timestamp,
    /// End of the current channel's response window.
    pub timeout_at: Timestamp,
    /// Current lifecycle status.
    pub status: ApprovalStatus,
    /// Ordered log of every alert attempt.
    #[serde(default)]
    pub channel_log: Vec<ChannelAttempt>,
    /// Optional free-text feedback supplied with the human decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_text: Option<String>,
    /// When a terminal status was reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<Timestamp>,
    /// How many channels of the escalation ladder have been consumed.
    #[serde(default)]
    pub escalation_step: usize,
    /// Set when history persistence is failing and the request is held
    /// in memory only.
    #[serde(default)]
    pub degraded: bool,
}

impl ApprovalRequest {
    /// Open a new pending approval request for `action`.
    #[must_use]
    pub fn new(action: ActionRequest, criticality: CriticalityTier, timeout_at: Timestamp) -> Self {
        Self {
            id: action.id.clone(),
            action,
            criticality,
            created_at: Timestamp::now(),
            timeout_at,
            status: ApprovalStatus::Pending,
            channel_log: Vec::new(),
            feedback_text: None,
            resolved_at: None,
            escalation_step: 0,
            degraded: false,
        }
    }

    /// Apply a status transition, validating it against the state machine.
    ///
    /// Terminal targets record `resolved_at`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the machine does not allow the move.
    pub fn transition(&mut self, to: ApprovalStatus, at: Timestamp) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        if to.is_terminal() {
            self.resolved_at = Some(at);
        }
        Ok(())
    }

    /// Reschedule a deferred request: back to pending with a fresh window
    /// and a restarted escalation ladder.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] unless the request is currently
    /// [`ApprovalStatus::Deferred`].
    pub fn reopen(&mut self, timeout_at: Timestamp) -> Result<(), InvalidTransition> {
        self.transition(ApprovalStatus::Pending, Timestamp::now())?;
        self.timeout_at = timeout_at;
        self.escalation_step = 0;
        Ok(())
    }

    /// Append an alert attempt to the channel log.
    pub fn record_attempt(&mut self, attempt: ChannelAttempt) {
        self.channel_log.push(attempt);
    }

    /// Time from creation to terminal resolution, if resolved.
    #[must_use]
    pub fn latency(&self) -> Option<chrono::Duration> {
        self.resolved_at.map(|at| at.since(self.created_at))
    }

    /// Whether the current response window has elapsed at `now`.
    #[must_use]
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        !self.status.is_terminal() && now > self.timeout_at
    }
}

impl fmt::Display for ApprovalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.criticality, self.action, self.status)
    }
}
