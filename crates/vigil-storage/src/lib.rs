//! Vigil Storage - Durable records for the approval engine.
//!
//! Two append-only stores back the engine:
//!
//! - [`HistoryStore`]: one full [`vigil_core::ApprovalRequest`] snapshot
//!   per state transition. Replay reconstructs in-flight requests after
//!   a restart; terminal history is immutable.
//! - [`FeedbackLog`]: one [`vigil_core::FeedbackRecord`] per resolved
//!   decision, re-aggregated wholesale by each learning cycle.
//!
//! Both come in a durable JSONL flavor and a volatile in-memory flavor
//! for tests and ephemeral deployments.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod feedback_log;
pub mod history;

pub use error::{StorageError, StorageResult};
pub use feedback_log::{FeedbackLog, JsonlFeedbackLog, MemoryFeedbackLog};
pub use history::{HistoryRecord, HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
