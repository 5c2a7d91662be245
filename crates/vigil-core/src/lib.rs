//! Vigil Core - Foundation types for the Vigil approval engine.
//!
//! This crate provides:
//! - Identifiers and timestamps shared across the workspace
//! - The criticality tier ordering that drives timeout and escalation policy
//! - [`ActionRequest`] and its coarse [`Fingerprint`] for feedback aggregation
//! - [`ApprovalRequest`] lifecycle state and transition validation
//! - Inbound human-response parsing (approve / deny / defer)
//! - Feedback record types emitted on terminal resolutions
//! - Retry utilities with exponential backoff

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod action;
pub mod approval;
pub mod feedback;
pub mod response;
pub mod retry;
pub mod types;

pub use action::{ActionContext, ActionRequest, Fingerprint, TargetCategory};
pub use approval::{
    ApprovalRequest, ApprovalStatus, AttemptOutcome, ChannelAttempt, InvalidTransition,
};
pub use feedback::{FeedbackOutcome, FeedbackRecord};
pub use response::{HumanResponse, ResponseParseError};
pub use retry::{retry, RetryConfig};
pub use types::{ActionType, ChannelKind, CriticalityTier, RequestId, Timestamp};
