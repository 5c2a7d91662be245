//! Vigil Feedback - Learning from human decisions.
//!
//! The [`FeedbackTracker`] appends every resolved decision to a
//! [`vigil_storage::FeedbackLog`], serves aggregate [`FeedbackInsights`],
//! and runs the bounded learning cycle that publishes new
//! [`vigil_classifier::WeightSnapshot`] generations.
//!
//! The cycle is conservative on purpose: a fingerprint moves only on
//! sustained, confident evidence, at most one step per cycle, within a
//! configured bound, and auto-executed actions are never evidence.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod insights;
pub mod tracker;

pub use error::{FeedbackError, FeedbackResult};
pub use insights::{FeedbackInsights, PatternStat};
pub use tracker::{FeedbackTracker, LearningReport};
