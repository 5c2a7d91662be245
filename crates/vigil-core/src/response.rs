//! Inbound human-response parsing.
//!
//! Responses arrive as free text from whatever channel reached the human
//! (SMS reply, voice keypad digit, notification action). Only the exact
//! approve / deny / defer vocabulary is accepted; anything else is
//! rejected, never interpreted.

use std::fmt;
use std::str::FromStr;

/// A parsed human decision on an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanResponse {
    /// Approve the action (`YES` / `1`).
    Approve,
    /// Deny the action (`NO` / `2`).
    Deny,
    /// Postpone the decision (`DEFER [minutes]` / `3 [minutes]`).
    Defer {
        /// Requested postponement, if given.
        minutes: Option<u32>,
    },
}

impl fmt::Display for HumanResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "approve"),
            Self::Deny => write!(f, "deny"),
            Self::Defer { minutes: Some(m) } => write!(f, "defer {m}m"),
            Self::Defer { minutes: None } => write!(f, "defer"),
        }
    }
}

/// The inbound text did not match the accepted vocabulary.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized response: {input:?}")]
pub struct ResponseParseError {
    /// The rejected input, truncated for logging.
    pub input: String,
}

impl FromStr for HumanResponse {
    type Err = ResponseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().unwrap_or("").to_uppercase();
        let arg = words.next();

        let reject = || ResponseParseError {
            input: s.chars().take(64).collect(),
        };

        // Trailing junk after a bare verb is rejected, not ignored.
        let no_trailing = |resp: Self| -> Result<Self, ResponseParseError> {
            if arg.is_none() {
                Ok(resp)
            } else {
                Err(reject())
            }
        };

        match verb.as_str() {
            "YES" | "1" => no_trailing(Self::Approve),
            "NO" | "2" => no_trailing(Self::Deny),
            "DEFER" | "3" => {
                let minutes = match arg {
                    None => None,
                    Some(raw) => Some(raw.parse::<u32>().map_err(|_| reject())?),
                };
                if words.next().is_some() {
                    return Err(reject());
                }
                Ok(Self::Defer { minutes })
            },
            _ => Err(reject()),
        }
    }
}
