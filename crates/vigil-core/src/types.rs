//! Common identifier, time, and classification types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an action and its approval request.
///
/// An [`crate::ActionRequest`] and the [`crate::ApprovalRequest`] created
/// for it share the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short prefix of the id, for log lines and summaries.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.to_string().chars().take(8).collect()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// A UTC timestamp.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Check whether this timestamp lies in the future.
    #[must_use]
    pub fn is_future(&self) -> bool {
        self.0 > Utc::now()
    }

    /// This timestamp shifted forward by `minutes`.
    #[must_use]
    pub fn plus_minutes(&self, minutes: i64) -> Self {
        Self(self.0 + Duration::minutes(minutes))
    }

    /// This timestamp shifted forward by `secs` seconds.
    #[must_use]
    pub fn plus_seconds(&self, secs: i64) -> Self {
        Self(self.0 + Duration::seconds(secs))
    }

    /// Duration elapsed since `earlier`, clamped to zero if negative.
    #[must_use]
    pub fn since(&self, earlier: Timestamp) -> Duration {
        (self.0 - earlier.0).max(Duration::zero())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// How much human oversight an action requires.
///
/// Total order: `Low < Medium < High`. Escalation channel ladders and
/// timeout windows are keyed by this value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CriticalityTier {
    /// Safe to auto-execute when confidence is sufficient.
    Low,
    /// Requires human sign-off on a relaxed schedule.
    Medium,
    /// Requires human sign-off with aggressive alerting.
    High,
}

impl CriticalityTier {
    /// Raise the tier by exactly one step, capped at [`Self::High`].
    #[must_use]
    pub fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    /// Lower the tier by exactly one step, capped at [`Self::Low`].
    #[must_use]
    pub fn lowered(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }

    /// Shift the tier by `steps` (negative lowers, positive raises),
    /// clamped to the `Low..=High` bounds.
    #[must_use]
    pub fn shifted(self, steps: i8) -> Self {
        let mut tier = self;
        for _ in 0..steps.unsigned_abs() {
            tier = if steps > 0 { tier.raised() } else { tier.lowered() };
        }
        tier
    }

    /// Stable string form used in config keys and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// All tiers, lowest first.
    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }
}

impl fmt::Display for CriticalityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An alert delivery channel, ordered by escalation priority.
///
/// The concrete providers live behind the `AlertChannel` trait in
/// `vigil-alert`; the core only ever names channels by kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Desktop notification.
    Notification,
    /// SMS text message.
    Sms,
    /// Voice call.
    Call,
}

impl ChannelKind {
    /// Stable string form used in config keys and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Sms => "sms",
            Self::Call => "call",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kinds of actions the system can be asked to perform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ActionType {
    EmailSend,
    EmailReply,
    CalendarCreate,
    CalendarModify,
    CallMake,
    SmsSend,
    FileCreate,
    FileModify,
    FileDelete,
    TaskCreate,
    ReminderSet,
    FocusSession,
    Archive,
    Log,
    Search,
    Analyze,
}

impl ActionType {
    /// Stable string form used in config keys and fingerprints.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailSend => "email_send",
            Self::EmailReply => "email_reply",
            Self::CalendarCreate => "calendar_create",
            Self::CalendarModify => "calendar_modify",
            Self::CallMake => "call_make",
            Self::SmsSend => "sms_send",
            Self::FileCreate => "file_create",
            Self::FileModify => "file_modify",
            Self::FileDelete => "file_delete",
            Self::TaskCreate => "task_create",
            Self::ReminderSet => "reminder_set",
            Self::FocusSession => "focus_session",
            Self::Archive => "archive",
            Self::Log => "log",
            Self::Search => "search",
            Self::Analyze => "analyze",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("req:"));
        assert_eq!(id1.short().len(), 8);
    }

    #[test]
    fn test_tier_order() {
        assert!(CriticalityTier::Low < CriticalityTier::Medium);
        assert!(CriticalityTier::Medium < CriticalityTier::High);
    }

    #[test]
    fn test_tier_raise_caps_at_high() {
        assert_eq!(CriticalityTier::Low.raised(), CriticalityTier::Medium);
        assert_eq!(CriticalityTier::Medium.raised(), CriticalityTier::High);
        assert_eq!(CriticalityTier::High.raised(), CriticalityTier::High);
    }

    #[test]
    fn test_tier_shift_clamps() {
        assert_eq!(CriticalityTier::Medium.shifted(-1), CriticalityTier::Low);
        assert_eq!(CriticalityTier::Low.shifted(-3), CriticalityTier::Low);
        assert_eq!(CriticalityTier::Medium.shifted(2), CriticalityTier::High);
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let t = Timestamp::now();
        let later = t.plus_minutes(5);
        assert!(later > t);
        assert_eq!(later.since(t), chrono::Duration::minutes(5));
        // since() never goes negative
        assert_eq!(t.since(later), chrono::Duration::zero());
    }

    #[test]
    fn test_serde_round_trip() {
        let tier: CriticalityTier = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(tier, CriticalityTier::High);
        let kind: ChannelKind = serde_json::from_str("\"sms\"").unwrap();
        assert_eq!(kind, ChannelKind::Sms);
        let ty: ActionType = serde_json::from_str("\"email_send\"").unwrap();
        assert_eq!(ty, ActionType::EmailSend);
        assert_eq!(serde_json::to_string(&ty).unwrap(), "\"email_send\"");
    }
}
