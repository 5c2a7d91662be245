//! The rule document: every knob the approval engine reads at runtime.
//!
//! Loaded once at startup and threaded through constructors as an
//! immutable value. The only runtime-mutable classification state is the
//! learned weight snapshot, which lives outside this document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vigil_core::{ActionType, ChannelKind, CriticalityTier};

/// One value per criticality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerTier<T> {
    /// Value for [`CriticalityTier::Low`].
    pub low: T,
    /// Value for [`CriticalityTier::Medium`].
    pub medium: T,
    /// Value for [`CriticalityTier::High`].
    pub high: T,
}

impl<T> PerTier<T> {
    /// The value for `tier`.
    pub fn get(&self, tier: CriticalityTier) -> &T {
        match tier {
            CriticalityTier::Low => &self.low,
            CriticalityTier::Medium => &self.medium,
            CriticalityTier::High => &self.high,
        }
    }
}

/// Keyword bags scanned against action content, keyed by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordPatterns {
    /// Keywords that vote HIGH.
    #[serde(default)]
    pub high: Vec<String>,
    /// Keywords that vote MEDIUM.
    #[serde(default)]
    pub medium: Vec<String>,
    /// Keywords that vote LOW.
    #[serde(default)]
    pub low: Vec<String>,
}

impl KeywordPatterns {
    /// The bag for `tier`.
    #[must_use]
    pub fn bag(&self, tier: CriticalityTier) -> &[String] {
        match tier {
            CriticalityTier::High => &self.high,
            CriticalityTier::Medium => &self.medium,
            CriticalityTier::Low => &self.low,
        }
    }
}

/// Sender/recipient domain membership rules.
///
/// Domain rules can only raise a computed tier, never lower one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRules {
    /// Domains with no effect on the computed tier.
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Domains that force the tier to HIGH.
    #[serde(default)]
    pub denied: Vec<String>,
    /// When set and `allowed` is non-empty, a domain on neither list
    /// raises the tier by one step.
    #[serde(default)]
    pub raise_unlisted: bool,
}

/// Daily business-hours window, in local hours `0..=23`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// First business hour (inclusive).
    pub start: u8,
    /// First non-business hour (exclusive).
    pub end: u8,
}

/// Time-sensitivity rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSensitive {
    /// The business-hours window.
    pub business_hours: BusinessHours,
    /// Raise the computed tier by one step outside business hours.
    #[serde(default)]
    pub raise_outside_hours: bool,
    /// Raise the computed tier by one step on weekends.
    #[serde(default)]
    pub raise_on_weekends: bool,
}

/// Tier thresholds for amounts extracted from action content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialThresholds {
    /// Amounts above this vote MEDIUM.
    pub medium_above: f64,
    /// Amounts above this vote HIGH.
    pub high_above: f64,
}

/// Per-tier timeout and escalation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Length of each channel's response window, in minutes.
    pub timeout_minutes: u32,
    /// Whether an unanswered window advances down the channel ladder
    /// instead of expiring immediately.
    pub escalation_enabled: bool,
    /// Channels appended to the ladder once escalated, in order.
    #[serde(default)]
    pub escalation_channels: Vec<ChannelKind>,
}

/// Per-tier alerting preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPreference {
    /// Ordered channel list; the first entry serves the PENDING phase.
    pub channels: Vec<ChannelKind>,
    /// Seconds between resends on the same channel.
    pub repeat_interval_secs: u32,
    /// Resends per channel after the initial send.
    pub max_repeats: u32,
}

/// Online-learning parameters for the feedback loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Master switch.
    pub enabled: bool,
    /// Records required for a fingerprint before it can be adjusted.
    pub min_feedback_count: usize,
    /// Approval (or denial) rate a fingerprint must sustain to move.
    pub confidence_threshold: f64,
    /// Largest tier shift a fingerprint may accumulate, in steps.
    pub max_auto_adjustment: u8,
}

/// An explicit override evaluated before all generic rules.
///
/// Every populated field must match; the first matching override wins
/// and short-circuits classification. `target` and `content` are glob
/// patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Action type to match, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,
    /// Glob matched against the target, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Glob matched against the content, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tier forced when the override matches.
    pub tier: CriticalityTier,
}

/// The complete rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Contacts whose involvement forces HIGH.
    #[serde(default)]
    pub vip_contacts: Vec<String>,
    /// Confidence above which a LOW classification bypasses approval.
    pub auto_execute_threshold: f64,
    /// Upper bound on a requested deferral, in minutes.
    pub max_defer_minutes: u32,
    /// Deferral applied when the human gives no duration.
    pub default_defer_minutes: u32,
    /// Per-action-type default tier.
    #[serde(default)]
    pub action_defaults: BTreeMap<ActionType, CriticalityTier>,
    /// Keyword bags per tier.
    #[serde(default)]
    pub keyword_patterns: KeywordPatterns,
    /// Domain membership rules.
    #[serde(default)]
    pub domain_rules: DomainRules,
    /// Explicit override patterns, evaluated first.
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
    /// Business-hours and weekend policy.
    pub time_sensitive: TimeSensitive,
    /// Financial-amount thresholds.
    pub financial_thresholds: FinancialThresholds,
    /// Per-tier timeout and escalation policy.
    pub timeout_settings: PerTier<TimeoutSettings>,
    /// Per-tier alerting preferences.
    pub alert_preferences: PerTier<AlertPreference>,
    /// Feedback-learning parameters.
    pub learning: LearningConfig,
}

impl RuleConfig {
    /// Default tier for an action type; MEDIUM when unconfigured.
    #[must_use]
    pub fn default_tier(&self, action_type: ActionType) -> CriticalityTier {
        self.action_defaults
            .get(&action_type)
            .copied()
            .unwrap_or(CriticalityTier::Medium)
    }

    /// The full ordered channel ladder for a tier.
    ///
    /// The preference list comes first; when escalation is enabled, the
    /// escalation channels not already present are appended.
    #[must_use]
    pub fn channel_ladder(&self, tier: CriticalityTier) -> Vec<ChannelKind> {
        let prefs = self.alert_preferences.get(tier);
        let timeouts = self.timeout_settings.get(tier);
        let mut ladder = prefs.channels.clone();
        if timeouts.escalation_enabled {
            for kind in &timeouts.escalation_channels {
                if !ladder.contains(kind) {
                    ladder.push(*kind);
                }
            }
        } else {
            ladder.truncate(1);
        }
        ladder
    }

    /// Clamp a requested deferral to the configured bounds.
    #[must_use]
    pub fn clamp_defer_minutes(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_defer_minutes)
            .clamp(1, self.max_defer_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;

    #[test]
    fn test_builtin_defaults_parse() {
        let config = loader::load(None).unwrap();
        assert_eq!(config.default_tier(ActionType::EmailSend), CriticalityTier::Medium);
        assert_eq!(config.default_tier(ActionType::CallMake), CriticalityTier::High);
        assert_eq!(config.default_tier(ActionType::ReminderSet), CriticalityTier::Low);
        assert!(config.vip_contacts.iter().any(|v| v == "CEO"));
    }

    #[test]
    fn test_default_timeouts_ordered() {
        let config = loader::load(None).unwrap();
        let high = config.timeout_settings.high.timeout_minutes;
        let medium = config.timeout_settings.medium.timeout_minutes;
        let low = config.timeout_settings.low.timeout_minutes;
        assert_eq!((high, medium, low), (5, 15, 60));
        assert!(high <= medium && medium <= low);
    }

    #[test]
    fn test_high_ladder_order() {
        let config = loader::load(None).unwrap();
        assert_eq!(
            config.channel_ladder(CriticalityTier::High),
            vec![ChannelKind::Call, ChannelKind::Sms, ChannelKind::Notification]
        );
    }

    #[test]
    fn test_ladder_without_escalation_is_single_channel() {
        let config = loader::load(None).unwrap();
        assert_eq!(
            config.channel_ladder(CriticalityTier::Low),
            vec![ChannelKind::Notification]
        );
    }

    #[test]
    fn test_clamp_defer_minutes() {
        let config = loader::load(None).unwrap();
        assert_eq!(config.clamp_defer_minutes(None), 10);
        assert_eq!(config.clamp_defer_minutes(Some(30)), 30);
        assert_eq!(config.clamp_defer_minutes(Some(10_000)), 120);
        assert_eq!(config.clamp_defer_minutes(Some(0)), 1);
    }
}
