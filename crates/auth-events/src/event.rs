//! Event and failure-reason types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a handshake ended without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// The user abandoned the handshake.
    Cancelled,
    /// No callback arrived before the deadline.
    TimedOut,
    /// A callback arrived but its payload could not be accepted.
    Rejected,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Cancelled => write!(f, "cancelled"),
            FailureReason::TimedOut => write!(f, "timed-out"),
            FailureReason::Rejected => write!(f, "rejected"),
        }
    }
}

/// A session lifecycle event.
///
/// Wire tags are kebab-case (`signed-in`, `signed-out`, `refreshed`,
/// `failed`); every variant carries the moment it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum AuthEvent {
    /// A handshake completed and credentials were stored.
    SignedIn {
        at: DateTime<Utc>,
        user_id: String,
    },
    /// The session was cleared.
    SignedOut { at: DateTime<Utc> },
    /// Stored credentials were replaced by refreshed ones.
    Refreshed { at: DateTime<Utc> },
    /// A handshake ended without a session.
    Failed {
        at: DateTime<Utc>,
        reason: FailureReason,
    },
}

impl AuthEvent {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        AuthEvent::SignedIn {
            at: Utc::now(),
            user_id: user_id.into(),
        }
    }

    pub fn signed_out() -> Self {
        AuthEvent::SignedOut { at: Utc::now() }
    }

    pub fn refreshed() -> Self {
        AuthEvent::Refreshed { at: Utc::now() }
    }

    pub fn failed(reason: FailureReason) -> Self {
        AuthEvent::Failed {
            at: Utc::now(),
            reason,
        }
    }

    /// The wire tag, for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn { .. } => "signed-in",
            AuthEvent::SignedOut { .. } => "signed-out",
            AuthEvent::Refreshed { .. } => "refreshed",
            AuthEvent::Failed { .. } => "failed",
        }
    }
}
