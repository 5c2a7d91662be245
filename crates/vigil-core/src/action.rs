//! Action requests and the coarse fingerprint used for feedback aggregation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{ActionType, RequestId, Timestamp};

/// Situational metadata attached to an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionContext {
    /// Explicit urgency flag supplied by the producer.
    #[serde(default)]
    pub urgent: bool,
    /// Role of whoever triggered the action, if known (e.g. "manager").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_role: Option<String>,
    /// Free-form extra metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// An autonomously proposed action awaiting a go/no-go decision.
///
/// Immutable once created; owned by the decision loop until resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Unique identifier, shared with the approval request if one is created.
    pub id: RequestId,
    /// The kind of action proposed.
    pub action_type: ActionType,
    /// Recipient or resource the action is aimed at.
    pub target: String,
    /// Opaque payload (email body, task text, ...).
    pub content: String,
    /// Situational metadata.
    pub context: ActionContext,
    /// When the action was proposed.
    pub created_at: Timestamp,
}

impl ActionRequest {
    /// Create a new action request.
    #[must_use]
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            action_type,
            target: target.into(),
            content: content.into(),
            context: ActionContext::default(),
            created_at: Timestamp::now(),
        }
    }

    /// Attach situational context.
    #[must_use]
    pub fn with_context(mut self, context: ActionContext) -> Self {
        self.context = context;
        self
    }

    /// Mark the action urgent.
    #[must_use]
    pub fn urgent(mut self) -> Self {
        self.context.urgent = true;
        self
    }

    /// The coarse fingerprint used to aggregate feedback across similar
    /// actions.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            action_type: self.action_type,
            target_category: TargetCategory::categorize(&self.target),
            urgent: self.context.urgent,
        }
    }

    /// Content truncated for log lines and alert previews.
    #[must_use]
    pub fn content_preview(&self, max: usize) -> String {
        if self.content.chars().count() <= max {
            self.content.clone()
        } else {
            let head: String = self.content.chars().take(max).collect();
            format!("{head}...")
        }
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.action_type, self.target)
    }
}

/// Coarse category of an action's target, derived from the target string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCategory {
    /// Executive or investor contact.
    Vip,
    /// Client or customer contact.
    Client,
    /// Internal team contact.
    Team,
    /// An email address, keyed by its domain.
    Domain(String),
    /// Anything else.
    Other,
}

impl TargetCategory {
    /// Categorize a free-text target.
    ///
    /// Role keywords win over domain extraction so that "CEO@company.com"
    /// aggregates with "CEO" rather than with everyone else at that domain.
    #[must_use]
    pub fn categorize(target: &str) -> Self {
        let lower = target.to_lowercase();
        const VIP_ROLES: [&str; 4] = ["ceo", "cto", "investor", "board"];
        const CLIENT_ROLES: [&str; 2] = ["client", "customer"];
        const TEAM_ROLES: [&str; 2] = ["team", "staff"];

        if VIP_ROLES.iter().any(|r| lower.contains(r)) {
            return Self::Vip;
        }
        if CLIENT_ROLES.iter().any(|r| lower.contains(r)) {
            return Self::Client;
        }
        if TEAM_ROLES.iter().any(|r| lower.contains(r)) {
            return Self::Team;
        }
        if let Some((_, domain)) = lower.split_once('@') {
            if !domain.is_empty() {
                return Self::Domain(domain.to_string());
            }
        }
        Self::Other
    }

    /// Stable string form used in fingerprints.
    #[must_use]
    pub fn as_key(&self) -> String {
        match self {
            Self::Vip => "vip".to_string(),
            Self::Client => "client".to_string(),
            Self::Team => "team".to_string(),
            Self::Domain(d) => format!("domain:{d}"),
            Self::Other => "other".to_string(),
        }
    }
}

/// A coarse key aggregating feedback across similar actions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// The action type.
    pub action_type: ActionType,
    /// Target category.
    pub target_category: TargetCategory,
    /// Whether the action carried an explicit urgency flag.
    pub urgent: bool,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.action_type,
            self.target_category.as_key(),
            if self.urgent { "urgent" } else { "routine" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_categories() {
        assert_eq!(TargetCategory::categorize("CEO@company.com"), TargetCategory::Vip);
        assert_eq!(
            TargetCategory::categorize("Client - Acme Corp"),
            TargetCategory::Client
        );
        assert_eq!(
            TargetCategory::categorize("team@company.com"),
            TargetCategory::Team
        );
        assert_eq!(
            TargetCategory::categorize("john@example.com"),
            TargetCategory::Domain("example.com".to_string())
        );
        assert_eq!(TargetCategory::categorize("self"), TargetCategory::Other);
    }

    #[test]
    fn test_fingerprint_groups_same_shape() {
        let a = ActionRequest::new(ActionType::EmailSend, "CEO@company.com", "Q4 numbers");
        let b = ActionRequest::new(ActionType::EmailSend, "CTO", "budget draft");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_fingerprint_distinguishes_urgency() {
        let a = ActionRequest::new(ActionType::TaskCreate, "self", "file taxes");
        let b = ActionRequest::new(ActionType::TaskCreate, "self", "file taxes").urgent();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_content_preview_truncates() {
        let action = ActionRequest::new(ActionType::Log, "self", "x".repeat(200));
        let preview = action.content_preview(100);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
        // Short content is untouched
        let short = ActionRequest::new(ActionType::Log, "self", "hi");
        assert_eq!(short.content_preview(100), "hi");
    }

    #[test]
    fn test_serialization() {
        let action = ActionRequest::new(ActionType::EmailSend, "a@b.com", "hello").urgent();
        let json = serde_json::to_string(&action).unwrap();
        let back: ActionRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(action, back);
    }
}
