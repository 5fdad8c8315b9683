//! Auth gating for routes and actions.

use crate::{IntentResult, PendingIntent, PendingIntentStore, Router};
use session_vault::SessionVault;
use std::sync::Arc;
use tracing::info;

/// Where a gated action's intent comes from.
pub enum IntentSource {
    /// Park this intent as given.
    Fixed(PendingIntent),
    /// Build the intent only if the gate actually trips.
    Lazy(Box<dyn FnOnce() -> PendingIntent + Send>),
}

impl IntentSource {
    fn into_intent(self) -> PendingIntent {
        match self {
            IntentSource::Fixed(intent) => intent,
            IntentSource::Lazy(build) => build(),
        }
    }
}

/// Outcome of a gated action.
#[derive(Debug, PartialEq)]
pub enum Guarded<T> {
    /// A session was live; the action ran.
    Allowed(T),
    /// Signed out: the intent was parked and the user sent to sign-in.
    NotAuthorized,
}

impl<T> Guarded<T> {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Guarded::Allowed(_))
    }

    pub fn into_inner(self) -> Option<T> {
        match self {
            Guarded::Allowed(value) => Some(value),
            Guarded::NotAuthorized => None,
        }
    }
}

/// Wraps actions that need a signed-in session.
///
/// When the gate trips it parks the caller's intent and redirects to the
/// sign-in route; after the handshake completes the replay coordinator
/// takes the user back to what they were doing.
pub struct SessionGate {
    vault: Arc<SessionVault>,
    store: Arc<PendingIntentStore>,
    router: Arc<dyn Router>,
    sign_in_path: String,
}

impl SessionGate {
    pub fn new(
        vault: Arc<SessionVault>,
        store: Arc<PendingIntentStore>,
        router: Arc<dyn Router>,
        sign_in_path: impl Into<String>,
    ) -> Self {
        Self {
            vault,
            store,
            router,
            sign_in_path: sign_in_path.into(),
        }
    }

    /// Run `action` if an unexpired session is stored. Otherwise park the
    /// intent, push the sign-in route and report `NotAuthorized`.
    pub fn require_auth<T>(
        &self,
        intent: IntentSource,
        action: impl FnOnce() -> T,
    ) -> IntentResult<Guarded<T>> {
        if self.vault.get_active().is_some() {
            return Ok(Guarded::Allowed(action()));
        }

        let intent = intent.into_intent();
        info!(
            path = %intent.resolved_path,
            "Gate tripped, parking intent and redirecting to sign-in"
        );
        self.store.store(&intent)?;
        self.router.push(&self.sign_in_path)?;
        Ok(Guarded::NotAuthorized)
    }
}
