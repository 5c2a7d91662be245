//! Alert message rendering.

use std::fmt;

use vigil_core::{ApprovalRequest, CriticalityTier, RequestId};

/// Characters of action content included in an alert.
const PREVIEW_CHARS: usize = 100;

/// Legend appended to every alert so the human knows how to answer.
const RESPONSE_LEGEND: &str = "Reply YES to approve, NO to deny, DEFER to postpone.";

/// A rendered alert, ready for any channel.
///
/// Channels are free to drop the body (a voice call may read only the
/// subject) but must carry the request id so responses can be routed
/// back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    /// The approval request this alert belongs to.
    pub request_id: RequestId,
    /// Criticality of the underlying action.
    pub criticality: CriticalityTier,
    /// One-line summary, e.g. `[high] approval needed: email_send -> CEO@company.com`.
    pub subject: String,
    /// Full text: summary, content preview, and the response legend.
    pub body: String,
    /// Zero for the first send on a channel, counting up per resend.
    pub resend: u32,
}

impl AlertMessage {
    /// Render the alert for an approval request.
    #[must_use]
    pub fn for_request(request: &ApprovalRequest, resend: u32) -> Self {
        let subject = format!(
            "[{}] approval needed: {}",
            request.criticality, request.action
        );
        let preview = request.action.content_preview(PREVIEW_CHARS);
        let body = format!("{subject}\n\"{preview}\"\n{RESPONSE_LEGEND}");
        Self {
            request_id: request.id.clone(),
            criticality: request.criticality,
            subject,
            body,
            resend,
        }
    }

    /// Whether this is a repeat of an unanswered alert.
    #[must_use]
    pub fn is_resend(&self) -> bool {
        self.resend > 0
    }
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_resend() {
            write!(f, "{} (resend #{})", self.subject, self.resend)
        } else {
            f.write_str(&self.subject)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{ActionRequest, ActionType, Timestamp};

    fn make_request() -> ApprovalRequest {
        let action = ActionRequest::new(ActionType::EmailSend, "CEO@company.com", "Q4 numbers");
        ApprovalRequest::new(action, CriticalityTier::High, Timestamp::now().plus_minutes(5))
    }

    #[test]
    fn test_message_carries_legend_and_preview() {
        let message = AlertMessage::for_request(&make_request(), 0);
        assert!(message.subject.contains("[high]"));
        assert!(message.subject.contains("email_send -> CEO@company.com"));
        assert!(message.body.contains("Q4 numbers"));
        assert!(message.body.contains("YES to approve"));
        assert!(!message.is_resend());
    }

    #[test]
    fn test_long_content_is_truncated() {
        let action = ActionRequest::new(ActionType::EmailSend, "a@b.com", "x".repeat(500));
        let request =
            ApprovalRequest::new(action, CriticalityTier::Medium, Timestamp::now().plus_minutes(15));
        let message = AlertMessage::for_request(&request, 0);
        assert!(message.body.contains(&format!("{}...", "x".repeat(100))));
        assert!(!message.body.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_resend_marker() {
        let message = AlertMessage::for_request(&make_request(), 2);
        assert!(message.is_resend());
        assert!(message.to_string().contains("resend #2"));
    }
}
