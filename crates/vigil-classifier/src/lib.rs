//! Vigil Classifier - Criticality scoring for proposed actions.
//!
//! Maps an [`vigil_core::ActionRequest`] onto a [`vigil_core::CriticalityTier`]
//! by evaluating the rule document in a fixed order (overrides, VIP
//! contacts, keywords, domains, business hours, financial amounts, type
//! defaults) and reports a confidence value in `[0, 1]` measuring how
//! many rule groups agreed.
//!
//! Classification is deterministic against a given rule document and
//! weight snapshot. The only mutable input, the learned per-fingerprint
//! adjustments, is read through [`WeightHandle`] as an immutable
//! versioned [`WeightSnapshot`] published by the feedback loop.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod classifier;
pub mod weights;

pub use classifier::{
    ActionClassifier, Classification, ClassificationError, ClassifierBuildError,
};
pub use weights::{WeightHandle, WeightSnapshot};
