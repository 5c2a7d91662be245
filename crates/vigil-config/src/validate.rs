//! Semantic checks on the merged rule document.

use vigil_core::CriticalityTier;

use crate::error::{ConfigError, ConfigResult};
use crate::types::RuleConfig;

/// Validate the merged rule document.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first failed check.
pub fn validate(config: &RuleConfig) -> ConfigResult<()> {
    let fail = |msg: String| Err(ConfigError::Invalid(msg));

    // Timeouts must tighten as criticality rises.
    let high = config.timeout_settings.high.timeout_minutes;
    let medium = config.timeout_settings.medium.timeout_minutes;
    let low = config.timeout_settings.low.timeout_minutes;
    if !(high <= medium && medium <= low) {
        return fail(format!(
            "timeout_minutes must satisfy high <= medium <= low, got {high}/{medium}/{low}"
        ));
    }
    for tier in CriticalityTier::all() {
        if config.timeout_settings.get(tier).timeout_minutes == 0 {
            return fail(format!("timeout_minutes for {tier} must be positive"));
        }
    }

    // Every tier needs at least one channel, and HIGH needs an
    // escalation ladder.
    for tier in CriticalityTier::all() {
        let prefs = config.alert_preferences.get(tier);
        if prefs.channels.is_empty() {
            return fail(format!("alert_preferences for {tier} has no channels"));
        }
        if prefs.repeat_interval_secs == 0 {
            return fail(format!("repeat_interval_secs for {tier} must be positive"));
        }
    }
    if config.timeout_settings.high.escalation_enabled
        && config.timeout_settings.high.escalation_channels.is_empty()
    {
        return fail("escalation_channels for high must be non-empty".to_string());
    }

    // Business hours.
    let hours = &config.time_sensitive.business_hours;
    if hours.start > 23 || hours.end > 24 {
        return fail(format!(
            "business_hours must be within 0..=23, got {}..{}",
            hours.start, hours.end
        ));
    }
    if hours.start >= hours.end {
        return fail(format!(
            "business_hours.start must be before end, got {}..{}",
            hours.start, hours.end
        ));
    }

    // Unit-interval thresholds.
    for (name, value) in [
        ("auto_execute_threshold", config.auto_execute_threshold),
        ("learning.confidence_threshold", config.learning.confidence_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return fail(format!("{name} must be within 0.0..=1.0, got {value}"));
        }
    }

    // Financial thresholds.
    let fin = &config.financial_thresholds;
    if fin.medium_above > fin.high_above {
        return fail(format!(
            "financial_thresholds.medium_above ({}) exceeds high_above ({})",
            fin.medium_above, fin.high_above
        ));
    }

    // Learning bounds: a tier can move at most the full LOW..HIGH range.
    if config.learning.max_auto_adjustment > 2 {
        return fail(format!(
            "learning.max_auto_adjustment must be at most 2, got {}",
            config.learning.max_auto_adjustment
        ));
    }

    if config.max_defer_minutes == 0 || config.default_defer_minutes == 0 {
        return fail("defer minutes must be positive".to_string());
    }
    if config.default_defer_minutes > config.max_defer_minutes {
        return fail(format!(
            "default_defer_minutes ({}) exceeds max_defer_minutes ({})",
            config.default_defer_minutes, config.max_defer_minutes
        ));
    }

    Ok(())
}
