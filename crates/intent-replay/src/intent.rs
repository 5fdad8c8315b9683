//! The pending-intent record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// What a signed-out user was trying to reach.
///
/// `url` is the destination exactly as requested; `resolved_path` is the
/// in-app route the router navigates to when the intent is replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingIntent {
    pub url: String,
    pub resolved_path: String,
    pub captured_at: DateTime<Utc>,
}

impl PendingIntent {
    /// Capture `url` as a pending intent.
    ///
    /// Absolute URLs are reduced to their path plus query; app-relative
    /// routes pass through unchanged.
    pub fn capture(url: &str) -> Self {
        Self {
            url: url.to_string(),
            resolved_path: resolve_path(url),
            captured_at: Utc::now(),
        }
    }
}

fn resolve_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        // Not absolute, already an app route
        Err(_) => url.to_string(),
    }
}
