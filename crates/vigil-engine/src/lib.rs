//! Vigil Engine - Orchestrating actions through human approval.
//!
//! Two layers:
//!
//! - [`HitlEngine`] owns the approval lifecycle: it tracks every open
//!   request, runs one driver task per request through its channel
//!   ladder (alert, resend, escalate, expire), accepts human
//!   resolutions, and persists a snapshot of every transition.
//! - [`DecisionLoop`] sits on top: classify an action, auto-execute the
//!   confidently-low ones, route the rest through the engine, execute on
//!   approval, and feed every outcome back into the learning loop.
//!
//! Requests survive restarts: [`HitlEngine::recover`] replays persisted
//! history and resumes every in-flight ladder where it left off.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod decision;
pub mod engine;
pub mod error;

pub use decision::{ActionExecutor, DecisionLoop, DecisionOutcome, ExecutionError};
pub use engine::{EngineStats, HitlEngine};
pub use error::{EngineError, EngineResult};
