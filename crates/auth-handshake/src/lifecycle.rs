//! Established-session operations: status, refresh application, sign-out.

use crate::{HandshakeError, HandshakeResult};
use auth_events::{AuthEvent, AuthEventBus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use session_vault::{PutOutcome, SessionCredentials, SessionVault};
use std::sync::Arc;
use tracing::{info, warn};

/// Point-in-time view of the stored session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Session operations outside the handshake itself.
///
/// The handshake signs a user in; everything that happens to the session
/// afterwards goes through here so that storage writes and event
/// publication stay paired.
pub struct SessionLifecycle {
    vault: Arc<SessionVault>,
    events: AuthEventBus,
}

impl SessionLifecycle {
    pub fn new(vault: Arc<SessionVault>, events: AuthEventBus) -> Self {
        Self { vault, events }
    }

    /// Whether an unexpired session is currently stored.
    pub fn is_signed_in(&self) -> bool {
        self.vault.get_active().is_some()
    }

    /// Session status for UI surfaces. Reads fail closed to signed-out.
    pub fn snapshot(&self) -> SessionSnapshot {
        match self.vault.get_active() {
            Some(credentials) => SessionSnapshot {
                authenticated: true,
                user_id: Some(credentials.user_id),
                expires_at: Some(credentials.expires_at),
            },
            None => SessionSnapshot {
                authenticated: false,
                user_id: None,
                expires_at: None,
            },
        }
    }

    /// Store refreshed credentials and announce the refresh.
    ///
    /// A sign-out that was already in flight wins: nothing is stored and
    /// no event is published.
    pub async fn apply_refreshed(&self, credentials: &SessionCredentials) -> HandshakeResult<()> {
        match self.vault.put(credentials).await? {
            PutOutcome::Stored => {
                info!(user_id = %credentials.user_id, "Session credentials refreshed");
                self.events.publish(AuthEvent::refreshed());
                Ok(())
            }
            PutOutcome::SupersededBySignOut => {
                warn!(
                    user_id = %credentials.user_id,
                    "Refresh superseded by sign-out, dropping credentials"
                );
                Err(HandshakeError::SupersededBySignOut)
            }
        }
    }

    /// Clear the stored session and announce the sign-out.
    ///
    /// Wins over any handshake completion or refresh still in flight.
    pub async fn sign_out(&self) -> HandshakeResult<()> {
        self.vault.clear().await?;
        info!("Signed out");
        self.events.publish(AuthEvent::signed_out());
        Ok(())
    }
}
