//! Action criticality classification.
//!
//! # Evaluation order
//!
//! 1. Explicit override patterns — first match wins and short-circuits
//! 2. VIP-contact match on the target — forces HIGH
//! 3. Keyword scan of the content — highest matching bag wins
//! 4. Domain rules — can only raise, never lower
//! 5. Time sensitivity — outside business hours (or weekends, when
//!    configured) raises by exactly one step, capped at HIGH
//! 6. Financial amounts found in the content — can raise past thresholds
//! 7. Fallback to the action-type default tier
//!
//! Classification is a pure function over the rule document and the
//! current weight snapshot: identical inputs always produce identical
//! output. The time rule reads the action's `created_at`, not the wall
//! clock.

use chrono::{Datelike, Timelike};
use globset::{Glob, GlobMatcher};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

use vigil_config::{OverrideRule, RuleConfig};
use vigil_core::{ActionRequest, CriticalityTier, RequestId};

use crate::weights::WeightHandle;

/// The classifier could not be constructed from the rule document.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierBuildError {
    /// An override glob or the amount pattern failed to compile.
    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },
}

/// The action request is malformed and cannot be classified.
///
/// The decision loop treats this conservatively as MEDIUM and logs it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassificationError {
    /// The action has no target.
    #[error("action {id} has an empty target")]
    MissingTarget {
        /// The malformed action.
        id: RequestId,
    },
}

/// The result of classifying one action.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// The assigned criticality tier.
    pub tier: CriticalityTier,
    /// Fraction of rule groups that agreed on the final tier, in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable reasons, one per rule group that fired.
    pub reasons: Vec<String>,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0}% agreement)", self.tier, self.confidence * 100.0)
    }
}

/// An override rule with its globs compiled.
#[derive(Debug)]
struct CompiledOverride {
    rule: OverrideRule,
    target: Option<GlobMatcher>,
    content: Option<GlobMatcher>,
}

impl CompiledOverride {
    fn matches(&self, action: &ActionRequest) -> bool {
        if let Some(ty) = self.rule.action_type {
            if ty != action.action_type {
                return false;
            }
        }
        if let Some(matcher) = &self.target {
            if !matcher.is_match(&action.target) {
                return false;
            }
        }
        if let Some(matcher) = &self.content {
            if !matcher.is_match(&action.content) {
                return false;
            }
        }
        self.rule.action_type.is_some() || self.target.is_some() || self.content.is_some()
    }
}

/// Scores an action into a criticality tier with a confidence value.
#[derive(Debug)]
pub struct ActionClassifier {
    config: Arc<RuleConfig>,
    weights: WeightHandle,
    overrides: Vec<CompiledOverride>,
    amount_re: Regex,
}

impl ActionClassifier {
    /// Compile the rule document into a classifier.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierBuildError::InvalidPattern`] when an override
    /// glob does not compile.
    pub fn new(config: Arc<RuleConfig>, weights: WeightHandle) -> Result<Self, ClassifierBuildError> {
        let compile = |pattern: &str| -> Result<GlobMatcher, ClassifierBuildError> {
            Glob::new(pattern)
                .map(|g| g.compile_matcher())
                .map_err(|e| ClassifierBuildError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
        };

        let mut overrides = Vec::with_capacity(config.overrides.len());
        for rule in &config.overrides {
            overrides.push(CompiledOverride {
                rule: rule.clone(),
                target: rule.target.as_deref().map(compile).transpose()?,
                content: rule.content.as_deref().map(compile).transpose()?,
            });
        }

        // Currency amounts: "$1,250.00", "$ 40", "USD 500".
        let amount_re = Regex::new(r"(?i)(?:\$|usd\s)\s*([0-9][0-9,]*(?:\.[0-9]{1,2})?)")
            .map_err(|e| ClassifierBuildError::InvalidPattern {
                pattern: "<amount pattern>".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            config,
            weights,
            overrides,
            amount_re,
        })
    }

    /// Classify an action.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::MissingTarget`] for a malformed
    /// action; no side effects in either case.
    pub fn classify(&self, action: &ActionRequest) -> Result<Classification, ClassificationError> {
        if action.target.trim().is_empty() {
            return Err(ClassificationError::MissingTarget {
                id: action.id.clone(),
            });
        }

        // (1) Explicit overrides short-circuit everything, including the
        // learned adjustment: explicit operator config wins.
        for compiled in &self.overrides {
            if compiled.matches(action) {
                return Ok(Classification {
                    tier: compiled.rule.tier,
                    confidence: 1.0,
                    reasons: vec![format!("override pattern forced {}", compiled.rule.tier)],
                });
            }
        }

        let mut reasons = Vec::new();
        // Opinions from independent rule groups, evaluated in spec order.
        let mut opinions: Vec<CriticalityTier> = Vec::new();

        // (2) VIP contacts force HIGH.
        let target_lower = action.target.to_lowercase();
        let vip = self
            .config
            .vip_contacts
            .iter()
            .find(|vip| target_lower.contains(&vip.to_lowercase()));
        if let Some(vip) = vip {
            opinions.push(CriticalityTier::High);
            reasons.push(format!("target matches VIP contact {vip:?}"));
        }

        // (3) Keyword bags, highest matching tier wins.
        let content_lower = action.content.to_lowercase();
        let keyword_tier = [CriticalityTier::High, CriticalityTier::Medium, CriticalityTier::Low]
            .into_iter()
            .find_map(|tier| {
                self.config
                    .keyword_patterns
                    .bag(tier)
                    .iter()
                    .find(|kw| content_lower.contains(&kw.to_lowercase()))
                    .map(|kw| (tier, kw.clone()))
            });
        if let Some((tier, keyword)) = keyword_tier {
            opinions.push(tier);
            reasons.push(format!("content contains {tier} keyword {keyword:?}"));
        }

        // (7) The action-type default always has an opinion; it is the
        // fallback when nothing else matched.
        let default_tier = self.config.default_tier(action.action_type);
        opinions.push(default_tier);
        reasons.push(format!(
            "action type {} defaults to {default_tier}",
            action.action_type
        ));

        let base = opinions
            .iter()
            .copied()
            .max()
            .unwrap_or(default_tier);
        let mut tier = base;
        let vip_forced = vip.is_some();

        // (4) Domain rules can only raise.
        if let Some(domain_tier) = self.domain_opinion(&target_lower, tier, &mut reasons) {
            opinions.push(domain_tier);
            tier = tier.max(domain_tier);
        }

        // (5) Time sensitivity raises by exactly one step.
        if let Some(time_tier) = self.time_opinion(action, tier, &mut reasons) {
            opinions.push(time_tier);
            tier = tier.max(time_tier);
        }

        // (6) Financial amounts can raise past thresholds.
        if let Some(amount_tier) = self.amount_opinion(&action.content, &mut reasons) {
            opinions.push(amount_tier);
            tier = tier.max(amount_tier);
        }

        // Explicit urgency flag in context raises to HIGH.
        if action.context.urgent {
            opinions.push(CriticalityTier::High);
            tier = tier.max(CriticalityTier::High);
            reasons.push("context carries an explicit urgency flag".to_string());
        }

        // Learned adjustment: bounded shift keyed by the fingerprint.
        // Never applied against a VIP match, and never past LOW/HIGH.
        if self.config.learning.enabled && !vip_forced {
            let snapshot = self.weights.load();
            let max = i8::try_from(self.config.learning.max_auto_adjustment).unwrap_or(i8::MAX);
            let shift = snapshot
                .adjustment_for(&action.fingerprint())
                .clamp(-max, max);
            if shift != 0 {
                let adjusted = tier.shifted(shift);
                if adjusted != tier {
                    reasons.push(format!(
                        "learned adjustment {shift:+} (snapshot v{})",
                        snapshot.version
                    ));
                    tier = adjusted;
                }
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let confidence = {
            let agree = opinions.iter().filter(|o| **o == tier).count();
            agree as f64 / opinions.len() as f64
        };

        Ok(Classification {
            tier,
            confidence,
            reasons,
        })
    }

    fn domain_opinion(
        &self,
        target_lower: &str,
        current: CriticalityTier,
        reasons: &mut Vec<String>,
    ) -> Option<CriticalityTier> {
        let domain = target_lower.split_once('@').map(|(_, d)| d)?;
        let rules = &self.config.domain_rules;
        if rules.denied.iter().any(|d| d.eq_ignore_ascii_case(domain)) {
            reasons.push(format!("domain {domain:?} is on the deny list"));
            return Some(CriticalityTier::High);
        }
        let allowed = rules.allowed.iter().any(|d| d.eq_ignore_ascii_case(domain));
        if rules.raise_unlisted && !rules.allowed.is_empty() && !allowed {
            reasons.push(format!("domain {domain:?} is not on the allow list"));
            return Some(current.raised());
        }
        None
    }

    fn time_opinion(
        &self,
        action: &ActionRequest,
        current: CriticalityTier,
        reasons: &mut Vec<String>,
    ) -> Option<CriticalityTier> {
        let rules = &self.config.time_sensitive;
        let at = action.created_at.0;
        let weekend = matches!(at.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun);
        if rules.raise_on_weekends && weekend {
            reasons.push("proposed on a weekend".to_string());
            return Some(current.raised());
        }
        let hour = u8::try_from(at.hour()).unwrap_or(0);
        let outside = hour < rules.business_hours.start || hour >= rules.business_hours.end;
        if rules.raise_outside_hours && outside {
            reasons.push(format!("proposed outside business hours (hour {hour})"));
            return Some(current.raised());
        }
        None
    }

    fn amount_opinion(&self, content: &str, reasons: &mut Vec<String>) -> Option<CriticalityTier> {
        let thresholds = &self.config.financial_thresholds;
        let mut largest: Option<f64> = None;
        for capture in self.amount_re.captures_iter(content) {
            let raw = capture.get(1)?.as_str().replace(',', "");
            if let Ok(amount) = raw.parse::<f64>() {
                largest = Some(largest.map_or(amount, |l: f64| l.max(amount)));
            }
        }
        let amount = largest?;
        if amount > thresholds.high_above {
            reasons.push(format!("amount {amount} exceeds the high threshold"));
            Some(CriticalityTier::High)
        } else if amount > thresholds.medium_above {
            reasons.push(format!("amount {amount} exceeds the medium threshold"));
            Some(CriticalityTier::Medium)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::WeightSnapshot;
    use vigil_config::RuleConfig;
    use vigil_core::{ActionContext, ActionType, Timestamp};

    fn business_hours_timestamp() -> Timestamp {
        // A Wednesday at 10:00 UTC.
        Timestamp(
            chrono::DateTime::parse_from_rfc3339("2025-03-12T10:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        )
    }

    fn at_business_hours(mut action: ActionRequest) -> ActionRequest {
        action.created_at = business_hours_timestamp();
        action
    }

    fn make_classifier() -> ActionClassifier {
        let config = Arc::new(vigil_config::load(None).unwrap());
        ActionClassifier::new(config, WeightHandle::new()).unwrap()
    }

    fn classifier_with(
        mutate: impl FnOnce(&mut RuleConfig),
        weights: WeightHandle,
    ) -> ActionClassifier {
        let mut config = vigil_config::load(None).unwrap();
        mutate(&mut config);
        ActionClassifier::new(Arc::new(config), weights).unwrap()
    }

    #[test]
    fn test_vip_with_urgent_keyword_is_high() {
        let classifier = make_classifier();
        let action = at_business_hours(ActionRequest::new(
            ActionType::EmailSend,
            "CEO@company.com",
            "urgent: Q4 numbers",
        ));
        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::High);
        assert!(result.reasons.iter().any(|r| r.contains("VIP")));
        assert!(result.reasons.iter().any(|r| r.contains("keyword")));
    }

    #[test]
    fn test_routine_low_action_has_full_agreement() {
        let classifier = make_classifier();
        let action = at_business_hours(ActionRequest::new(
            ActionType::ReminderSet,
            "self",
            "buy groceries",
        ));
        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::Low);
        // Only the type default voted, so agreement is total.
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deterministic() {
        let classifier = make_classifier();
        let action = at_business_hours(ActionRequest::new(
            ActionType::EmailSend,
            "team@company.com",
            "weekly summary",
        ));
        let first = classifier.classify(&action).unwrap();
        let second = classifier.classify(&action).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_target_rejected() {
        let classifier = make_classifier();
        let action = ActionRequest::new(ActionType::EmailSend, "  ", "hello");
        assert!(matches!(
            classifier.classify(&action),
            Err(ClassificationError::MissingTarget { .. })
        ));
    }

    #[test]
    fn test_override_short_circuits() {
        let classifier = classifier_with(
            |config| {
                config.overrides.push(vigil_config::OverrideRule {
                    action_type: Some(ActionType::EmailSend),
                    target: Some("*@partners.example".to_string()),
                    content: None,
                    tier: CriticalityTier::Low,
                });
            },
            WeightHandle::new(),
        );
        // Without the override this would be MEDIUM (type default).
        let action = at_business_hours(ActionRequest::new(
            ActionType::EmailSend,
            "bot@partners.example",
            "urgent deadline asap",
        ));
        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::Low);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_denied_domain_raises_to_high() {
        let classifier = classifier_with(
            |config| {
                config.domain_rules.denied.push("rival.example".to_string());
            },
            WeightHandle::new(),
        );
        let action = at_business_hours(ActionRequest::new(
            ActionType::EmailSend,
            "sales@rival.example",
            "catalogue",
        ));
        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::High);
    }

    #[test]
    fn test_outside_hours_raises_one_step() {
        let classifier = make_classifier();
        let mut action =
            ActionRequest::new(ActionType::EmailSend, "someone@example.com", "notes");
        // 23:00 UTC on a weekday
        action.created_at = Timestamp(
            chrono::DateTime::parse_from_rfc3339("2025-03-12T23:00:00Z")
                .unwrap()
                .with_timezone(&chrono::Utc),
        );
        let result = classifier.classify(&action).unwrap();
        // MEDIUM type default raised one step
        assert_eq!(result.tier, CriticalityTier::High);
        assert!(result.reasons.iter().any(|r| r.contains("business hours")));
    }

    #[test]
    fn test_large_amount_raises_to_high() {
        let classifier = make_classifier();
        let action = at_business_hours(ActionRequest::new(
            ActionType::EmailSend,
            "vendor@example.com",
            "invoice attached, total $12,500.00 due Friday",
        ));
        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::High);
        assert!(result.reasons.iter().any(|r| r.contains("high threshold")));
    }

    #[test]
    fn test_small_amount_does_not_raise() {
        let classifier = make_classifier();
        let action = at_business_hours(ActionRequest::new(
            ActionType::TaskCreate,
            "self",
            "reimburse $15 lunch",
        ));
        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::Low);
    }

    #[test]
    fn test_urgent_context_forces_high() {
        let classifier = make_classifier();
        let action = at_business_hours(
            ActionRequest::new(ActionType::TaskCreate, "self", "call the bank")
                .with_context(ActionContext {
                    urgent: true,
                    ..ActionContext::default()
                }),
        );
        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::High);
    }

    #[test]
    fn test_learned_adjustment_moves_one_tier_down() {
        let weights = WeightHandle::new();
        let classifier = classifier_with(|_| (), weights.clone());
        let action = at_business_hours(ActionRequest::new(
            ActionType::EmailSend,
            "team@company.com",
            "weekly summary",
        ));
        let before = classifier.classify(&action).unwrap();
        assert_eq!(before.tier, CriticalityTier::Medium);

        let mut snapshot = WeightSnapshot::empty();
        snapshot.version = 1;
        snapshot.adjustments.insert(action.fingerprint(), -1);
        weights.publish(snapshot);

        let after = classifier.classify(&action).unwrap();
        assert_eq!(after.tier, CriticalityTier::Low);
    }

    #[test]
    fn test_adjustment_never_lowers_below_low() {
        let weights = WeightHandle::new();
        let classifier = classifier_with(|_| (), weights.clone());
        let action = at_business_hours(ActionRequest::new(
            ActionType::ReminderSet,
            "self",
            "water plants",
        ));
        let mut snapshot = WeightSnapshot::empty();
        snapshot.version = 1;
        // Larger than max_auto_adjustment; must be clamped to one step
        snapshot.adjustments.insert(action.fingerprint(), -2);
        weights.publish(snapshot);

        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::Low);
    }

    #[test]
    fn test_adjustment_does_not_override_vip() {
        let weights = WeightHandle::new();
        let classifier = classifier_with(|_| (), weights.clone());
        let action = at_business_hours(ActionRequest::new(
            ActionType::EmailSend,
            "CEO@company.com",
            "weekly summary",
        ));
        let mut snapshot = WeightSnapshot::empty();
        snapshot.version = 1;
        snapshot.adjustments.insert(action.fingerprint(), -1);
        weights.publish(snapshot);

        let result = classifier.classify(&action).unwrap();
        assert_eq!(result.tier, CriticalityTier::High);
    }
}
