//! Alert dispatch across registered channel providers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use vigil_core::{AttemptOutcome, ChannelAttempt, ChannelKind, Timestamp};

use crate::channel::AlertChannel;
use crate::error::ChannelError;
use crate::message::AlertMessage;

/// Default bound on one provider call.
const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Routes alerts to registered providers and records what happened.
///
/// Delivery is best effort: the dispatcher never returns an error, it
/// returns a [`ChannelAttempt`] describing the outcome. The escalation
/// ladder in the engine treats a failed or timed-out attempt the same as
/// an unanswered one.
pub struct AlertDispatcher {
    providers: HashMap<ChannelKind, Arc<dyn AlertChannel>>,
    delivery_timeout: Duration,
}

impl AlertDispatcher {
    /// An empty dispatcher with the default delivery timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    /// Override the per-call delivery timeout.
    #[must_use]
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Register a provider, replacing any previous provider for its kind.
    pub fn register(&mut self, provider: Arc<dyn AlertChannel>) {
        self.providers.insert(provider.kind(), provider);
    }

    /// Whether a provider is registered for `kind`.
    #[must_use]
    pub fn has_provider(&self, kind: ChannelKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Send an alert on one channel and record the outcome.
    pub async fn dispatch(&self, kind: ChannelKind, message: &AlertMessage) -> ChannelAttempt {
        let attempted_at = Timestamp::now();
        let outcome = match self.try_deliver(kind, message).await {
            Ok(()) => {
                tracing::debug!(
                    channel = %kind,
                    request_id = %message.request_id,
                    resend = message.resend,
                    "alert delivered"
                );
                AttemptOutcome::Delivered
            },
            Err(DeliveryFailure::TimedOut) => {
                tracing::warn!(
                    channel = %kind,
                    request_id = %message.request_id,
                    "provider call timed out"
                );
                AttemptOutcome::TimedOut
            },
            Err(DeliveryFailure::Channel(err)) => {
                tracing::warn!(
                    channel = %kind,
                    request_id = %message.request_id,
                    error = %err,
                    "alert delivery failed"
                );
                AttemptOutcome::Failed {
                    reason: err.to_string(),
                }
            },
        };
        ChannelAttempt {
            channel: kind,
            attempted_at,
            outcome,
        }
    }

    async fn try_deliver(
        &self,
        kind: ChannelKind,
        message: &AlertMessage,
    ) -> Result<(), DeliveryFailure> {
        let provider = self
            .providers
            .get(&kind)
            .ok_or(DeliveryFailure::Channel(ChannelError::NoProvider {
                channel: kind,
            }))?;
        if !provider.is_available() {
            return Err(DeliveryFailure::Channel(ChannelError::Unavailable {
                channel: kind,
            }));
        }
        match tokio::time::timeout(self.delivery_timeout, provider.deliver(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(DeliveryFailure::Channel(err)),
            Err(_) => Err(DeliveryFailure::TimedOut),
        }
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

enum DeliveryFailure {
    Channel(ChannelError),
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ConsoleChannel;
    use async_trait::async_trait;
    use vigil_core::{ActionRequest, ActionType, ApprovalRequest, CriticalityTier, Timestamp};

    struct FailingChannel;

    #[async_trait]
    impl AlertChannel for FailingChannel {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Sms
        }

        async fn deliver(&self, _message: &AlertMessage) -> crate::error::ChannelResult<()> {
            Err(ChannelError::Provider {
                channel: ChannelKind::Sms,
                message: "gateway rejected".to_string(),
            })
        }
    }

    struct HangingChannel;

    #[async_trait]
    impl AlertChannel for HangingChannel {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Call
        }

        async fn deliver(&self, _message: &AlertMessage) -> crate::error::ChannelResult<()> {
            std::future::pending().await
        }
    }

    struct OfflineChannel;

    #[async_trait]
    impl AlertChannel for OfflineChannel {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Notification
        }

        fn is_available(&self) -> bool {
            false
        }

        async fn deliver(&self, _message: &AlertMessage) -> crate::error::ChannelResult<()> {
            Ok(())
        }
    }

    fn make_message() -> AlertMessage {
        let action = ActionRequest::new(ActionType::EmailSend, "CEO@company.com", "Q4 numbers");
        let request = ApprovalRequest::new(
            action,
            CriticalityTier::High,
            Timestamp::now().plus_minutes(5),
        );
        AlertMessage::for_request(&request, 0)
    }

    #[tokio::test]
    async fn test_dispatch_records_delivery() {
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.register(Arc::new(ConsoleChannel::new(ChannelKind::Notification)));

        let attempt = dispatcher
            .dispatch(ChannelKind::Notification, &make_message())
            .await;
        assert_eq!(attempt.channel, ChannelKind::Notification);
        assert!(attempt.outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_dispatch_without_provider_fails() {
        let dispatcher = AlertDispatcher::new();
        let attempt = dispatcher.dispatch(ChannelKind::Call, &make_message()).await;
        assert!(matches!(attempt.outcome, AttemptOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_records_provider_error() {
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.register(Arc::new(FailingChannel));

        let attempt = dispatcher.dispatch(ChannelKind::Sms, &make_message()).await;
        match attempt.outcome {
            AttemptOutcome::Failed { reason } => assert!(reason.contains("gateway rejected")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unavailable_provider_is_skipped() {
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.register(Arc::new(OfflineChannel));

        let attempt = dispatcher
            .dispatch(ChannelKind::Notification, &make_message())
            .await;
        match attempt.outcome {
            AttemptOutcome::Failed { reason } => assert!(reason.contains("unavailable")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_times_out() {
        let mut dispatcher =
            AlertDispatcher::new().with_delivery_timeout(Duration::from_secs(2));
        dispatcher.register(Arc::new(HangingChannel));

        let attempt = dispatcher.dispatch(ChannelKind::Call, &make_message()).await;
        assert_eq!(attempt.outcome, AttemptOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_register_replaces_provider() {
        let mut dispatcher = AlertDispatcher::new();
        dispatcher.register(Arc::new(FailingChannel));
        assert!(dispatcher.has_provider(ChannelKind::Sms));

        dispatcher.register(Arc::new(ConsoleChannel::new(ChannelKind::Sms)));
        let attempt = dispatcher.dispatch(ChannelKind::Sms, &make_message()).await;
        assert!(attempt.outcome.is_delivered());
    }
}
