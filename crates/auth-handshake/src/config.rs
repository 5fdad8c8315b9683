//! Handshake configuration.

use std::time::Duration;

/// Default forum base URL (can be overridden at compile time via the
/// AGORA_FORUM_URL env var).
pub const DEFAULT_FORUM_URL: &str = match option_env!("AGORA_FORUM_URL") {
    Some(url) => url,
    None => "https://forum.agora.chat",
};

/// Deep link scheme the mobile shell registers for callbacks.
pub const DEFAULT_CALLBACK_SCHEME: &str = "agora";

/// How long a launched attempt waits for its callback.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

const DEFAULT_APPLICATION_NAME: &str = "Agora Mobile";

/// Settings for the browser-mediated authorization handshake.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    /// Forum base URL, no trailing slash.
    pub forum_url: String,
    /// Scheme every authorization callback must carry.
    pub callback_scheme: String,
    /// Application name shown on the forum's consent page.
    pub application_name: String,
    /// Access scopes requested from the forum.
    pub scopes: Vec<String>,
    /// Deadline for a pending attempt.
    pub timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            forum_url: DEFAULT_FORUM_URL.trim_end_matches('/').to_string(),
            callback_scheme: DEFAULT_CALLBACK_SCHEME.to_string(),
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            scopes: vec![
                "read".to_string(),
                "write".to_string(),
                "notifications".to_string(),
            ],
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl HandshakeConfig {
    /// Build a config honoring runtime environment overrides.
    pub fn from_env() -> Self {
        let forum_url = std::env::var("AGORA_FORUM_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FORUM_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let timeout_secs: u64 = std::env::var("AGORA_AUTHORIZE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            forum_url,
            timeout: Duration::from_secs(timeout_secs),
            ..Self::default()
        }
    }
}
