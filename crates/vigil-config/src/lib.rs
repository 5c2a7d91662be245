//! Vigil Config - The rule document for the Vigil approval engine.
//!
//! One TOML document enumerates everything the engine consults at
//! request time: VIP contacts, per-action-type default tiers, keyword
//! bags, domain rules, override patterns, business hours, financial
//! thresholds, per-tier timeout and escalation policy, alert
//! preferences, and learning parameters.
//!
//! The document is loaded once ([`load`]) by overlaying an optional user
//! file on the embedded defaults, validated, and then threaded through
//! constructors as an immutable value. Nothing in here mutates at
//! runtime; learned weight adjustments live in `vigil-classifier`'s
//! versioned snapshots instead.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod loader;
pub mod types;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::load;
pub use types::{
    AlertPreference, BusinessHours, DomainRules, FinancialThresholds, KeywordPatterns,
    LearningConfig, OverrideRule, PerTier, RuleConfig, TimeSensitive, TimeoutSettings,
};
