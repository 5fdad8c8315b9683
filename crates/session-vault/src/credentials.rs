//! The persisted session record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds of remaining lifetime below which a session counts as expired.
/// Keeps the client from presenting a token the server is about to refuse.
pub const EXPIRY_LEEWAY_SECS: i64 = 60;

/// Credentials issued by the forum at the end of an authorization handshake.
///
/// Serialized with camelCase field names; this is both the on-disk record
/// shape and the plaintext shape inside an authorization payload.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCredentials {
    /// Forum user the session belongs to
    pub user_id: String,
    /// Bearer token for forum API calls
    pub access_token: String,
    /// Rotation token, absent for servers that issue fixed-lifetime sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the forum issued the session
    pub issued_at: DateTime<Utc>,
    /// When the access token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl SessionCredentials {
    /// Whether the session is expired or within the expiry leeway.
    pub fn is_expired(&self) -> bool {
        let remaining = self.expires_at.signed_duration_since(Utc::now());
        remaining < Duration::seconds(EXPIRY_LEEWAY_SECS)
    }
}

// Tokens stay out of Debug output so they cannot leak through logs.
impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
