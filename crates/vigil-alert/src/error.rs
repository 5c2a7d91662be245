//! Error types for alert delivery.

use vigil_core::ChannelKind;

/// A provider failed to deliver an alert.
///
/// The dispatcher converts these into [`vigil_core::AttemptOutcome`]
/// entries; a delivery failure never aborts the approval flow, it only
/// shows up in the channel log and feeds the escalation ladder.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// No provider is registered for the channel.
    #[error("no provider registered for {channel}")]
    NoProvider {
        /// The channel that had no provider.
        channel: ChannelKind,
    },
    /// The provider is currently unable to accept alerts.
    #[error("{channel} provider unavailable")]
    Unavailable {
        /// The unavailable channel.
        channel: ChannelKind,
    },
    /// The provider rejected the alert or failed mid-delivery.
    #[error("{channel} provider error: {message}")]
    Provider {
        /// The failing channel.
        channel: ChannelKind,
        /// Provider-supplied detail.
        message: String,
    },
}

/// Result alias for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
