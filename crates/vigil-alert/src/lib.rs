//! Vigil Alert - Getting a human's attention.
//!
//! Providers implement [`AlertChannel`] for one channel each (desktop
//! notification, SMS, voice call); the [`AlertDispatcher`] routes a
//! rendered [`AlertMessage`] to the right provider, bounds the provider
//! call with a timeout, and reports the outcome as a
//! [`vigil_core::ChannelAttempt`] for the request's channel log.
//!
//! Delivery is best effort by design: a failed or timed-out attempt is
//! recorded and the escalation ladder moves on, exactly as if the human
//! had not answered.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod channel;
pub mod dispatcher;
pub mod error;
pub mod message;

pub use channel::{AlertChannel, ConsoleChannel};
pub use dispatcher::AlertDispatcher;
pub use error::{ChannelError, ChannelResult};
pub use message::AlertMessage;
