//! The alert channel trait and the built-in console provider.

use async_trait::async_trait;

use vigil_core::ChannelKind;

use crate::error::ChannelResult;
use crate::message::AlertMessage;

/// A delivery provider for one alert channel.
///
/// Implementations wrap a concrete provider (an SMS gateway, a telephony
/// API, a desktop notifier). `deliver` only confirms hand-off to the
/// provider; the human response arrives out of band through the engine's
/// resolution API.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Which channel this provider serves.
    fn kind(&self) -> ChannelKind;

    /// Whether the provider can currently accept alerts.
    ///
    /// An unavailable provider is skipped without waiting out the
    /// delivery timeout.
    fn is_available(&self) -> bool {
        true
    }

    /// Hand an alert to the provider.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ChannelError`] when the provider rejects the
    /// alert or is unreachable.
    async fn deliver(&self, message: &AlertMessage) -> ChannelResult<()>;
}

/// Fallback provider that writes alerts to the log.
///
/// Registered for any channel that has no real provider configured, so a
/// bare deployment still surfaces every alert somewhere visible.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleChannel {
    kind: ChannelKind,
}

impl ConsoleChannel {
    /// A console provider standing in for `kind`.
    #[must_use]
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl AlertChannel for ConsoleChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn deliver(&self, message: &AlertMessage) -> ChannelResult<()> {
        tracing::info!(
            channel = %self.kind,
            request_id = %message.request_id,
            resend = message.resend,
            "{}",
            message.body
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{ActionRequest, ActionType, ApprovalRequest, CriticalityTier, Timestamp};

    #[tokio::test]
    async fn test_console_channel_always_delivers() {
        let channel = ConsoleChannel::new(ChannelKind::Notification);
        assert_eq!(channel.kind(), ChannelKind::Notification);
        assert!(channel.is_available());

        let action = ActionRequest::new(ActionType::ReminderSet, "self", "water plants");
        let request =
            ApprovalRequest::new(action, CriticalityTier::Low, Timestamp::now().plus_minutes(60));
        let message = AlertMessage::for_request(&request, 0);
        channel.deliver(&message).await.unwrap();
    }
}
