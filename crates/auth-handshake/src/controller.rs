//! Browser-mediated authorization handshake controller.

use crate::authorize::{AuthorizeRequest, ExternalAuthorizer};
use crate::callback::parse_callback;
use crate::handshake_fsm::{
    HandshakeMachine, HandshakeMachineInput, HandshakeOutcome, HandshakePhase,
};
use crate::{HandshakeConfig, HandshakeError, HandshakeResult};
use auth_events::{AuthEvent, AuthEventBus, FailureReason};
use chrono::{DateTime, Utc};
use handshake_crypto::{decrypt_credentials, generate_attempt_keypair, AttemptKeyPair};
use serde::Serialize;
use session_vault::{PutOutcome, SessionCredentials, SessionVault};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Keypair and bookkeeping for the attempt currently in flight.
struct ActiveAttempt {
    keypair: AttemptKeyPair,
    deadline: DateTime<Utc>,
    generation: u64,
}

/// Mutable controller state, guarded by a single lock.
struct ControllerState {
    machine: HandshakeMachine,
    attempt: Option<ActiveAttempt>,
    last_outcome: Option<HandshakeOutcome>,
}

impl ControllerState {
    fn transition(&mut self, input: &HandshakeMachineInput) -> HandshakeResult<()> {
        let old_state = HandshakePhase::from(self.machine.state());
        self.machine.consume(input).map_err(|_| {
            HandshakeError::InvalidTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                self.machine.state()
            ))
        })?;
        let new_state = HandshakePhase::from(self.machine.state());
        debug!(?old_state, ?new_state, "Handshake state transition");
        Ok(())
    }

    /// Drive the machine through a terminal state and straight back to
    /// idle, recording how the attempt ended.
    fn resolve(
        &mut self,
        input: &HandshakeMachineInput,
        outcome: HandshakeOutcome,
    ) -> HandshakeResult<()> {
        self.transition(input)?;
        self.last_outcome = Some(outcome);
        self.transition(&HandshakeMachineInput::Reset)
    }
}

/// Point-in-time view of the handshake for status surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeSnapshot {
    pub phase: HandshakePhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<HandshakeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

/// Drives sign-in attempts end to end: keypair generation, browser
/// launch, callback decryption, credential storage and event
/// publication.
///
/// At most one attempt is pending at a time. A new [`begin`] replaces
/// whatever was pending; the replaced attempt's key material is
/// destroyed on the spot and any callback that later names it is
/// rejected without touching the live attempt.
///
/// [`begin`]: HandshakeController::begin
#[derive(Clone)]
pub struct HandshakeController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: HandshakeConfig,
    vault: Arc<SessionVault>,
    events: AuthEventBus,
    authorizer: Arc<dyn ExternalAuthorizer>,
    state: Mutex<ControllerState>,
    generation: AtomicU64,
}

impl HandshakeController {
    pub fn new(
        config: HandshakeConfig,
        vault: Arc<SessionVault>,
        events: AuthEventBus,
        authorizer: Arc<dyn ExternalAuthorizer>,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                config,
                vault,
                events,
                authorizer,
                state: Mutex::new(ControllerState {
                    machine: HandshakeMachine::new(),
                    attempt: None,
                    last_outcome: None,
                }),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Start a sign-in attempt: mint a fresh keypair, open the forum's
    /// authorization page and wait for the deep link callback.
    ///
    /// Replaces any pending attempt. Returns the request that was opened
    /// so callers can show or log the authorization URL.
    pub async fn begin(&self) -> HandshakeResult<AuthorizeRequest> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;

        // Mint the keypair before touching the machine so a generation
        // failure leaves any pending attempt untouched.
        let keypair = generate_attempt_keypair(Uuid::new_v4())?;
        let attempt_id = keypair.attempt_id;

        state.transition(&HandshakeMachineInput::Begin)?;

        if let Some(replaced) = state.attempt.take() {
            info!(
                replaced = %replaced.keypair.attempt_id,
                attempt_id = %attempt_id,
                "Replacing pending authorization attempt"
            );
            replaced.keypair.destroy();
        }
        state.last_outcome = None;

        let request = match AuthorizeRequest::build(&inner.config, &keypair) {
            Ok(request) => request,
            Err(e) => return Self::fail_launch(&mut state, keypair, e),
        };

        if let Err(e) = inner.authorizer.open(&request) {
            warn!(attempt_id = %attempt_id, error = %e, "Browser launch failed");
            return Self::fail_launch(&mut state, keypair, e);
        }

        state.transition(&HandshakeMachineInput::Opened)?;

        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Utc::now() + chrono::Duration::seconds(inner.config.timeout.as_secs() as i64);
        state.attempt = Some(ActiveAttempt {
            keypair,
            deadline,
            generation,
        });

        // Deadline watchdog. A stale generation means the attempt
        // already resolved and the timer must do nothing.
        let watchdog = Arc::clone(inner);
        let timeout = inner.config.timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            watchdog.expire(generation).await;
        });

        info!(attempt_id = %attempt_id, deadline = %deadline, "Authorization attempt launched");
        Ok(request)
    }

    fn fail_launch(
        state: &mut ControllerState,
        keypair: AttemptKeyPair,
        error: HandshakeError,
    ) -> HandshakeResult<AuthorizeRequest> {
        keypair.destroy();
        state.transition(&HandshakeMachineInput::LaunchFailed)?;
        state.last_outcome = Some(HandshakeOutcome::LaunchFailed);
        Err(error)
    }

    /// Feed a deep link into the handshake.
    ///
    /// Only a callback naming the pending attempt is processed; on
    /// success the credentials are stored before `signed-in` is
    /// published. A mismatched or stale callback is rejected without
    /// touching the pending attempt or the stored session.
    pub async fn handle_callback(&self, raw_url: &str) -> HandshakeResult<SessionCredentials> {
        let payload = parse_callback(raw_url, &self.inner.config.callback_scheme)?;

        let mut state = self.inner.state.lock().await;

        let Some(attempt) = state.attempt.take() else {
            warn!(received = %payload.attempt_id, "Callback arrived with no attempt pending");
            return Err(HandshakeError::NoPendingAttempt);
        };

        if attempt.keypair.attempt_id != payload.attempt_id {
            warn!(
                received = %payload.attempt_id,
                pending = %attempt.keypair.attempt_id,
                "Callback answers a replaced or unknown attempt"
            );
            let received = payload.attempt_id;
            state.attempt = Some(attempt);
            return Err(HandshakeError::AttemptMismatch { received });
        }

        // The pending attempt resolves now, one way or the other.
        let attempt_id = attempt.keypair.attempt_id;
        match decrypt_credentials(&payload, &attempt.keypair) {
            Ok(credentials) => {
                attempt.keypair.destroy();
                self.store_and_announce(&mut state, attempt_id, credentials)
                    .await
            }
            Err(e) => {
                warn!(attempt_id = %attempt_id, error = %e, "Authorization payload refused");
                attempt.keypair.destroy();
                state.resolve(
                    &HandshakeMachineInput::CallbackRejected,
                    HandshakeOutcome::Rejected,
                )?;
                self.inner
                    .events
                    .publish(AuthEvent::failed(FailureReason::Rejected));
                Err(HandshakeError::Payload(e))
            }
        }
    }

    async fn store_and_announce(
        &self,
        state: &mut ControllerState,
        attempt_id: Uuid,
        credentials: SessionCredentials,
    ) -> HandshakeResult<SessionCredentials> {
        match self.inner.vault.put(&credentials).await {
            Ok(PutOutcome::Stored) => {
                state.resolve(
                    &HandshakeMachineInput::CallbackAccepted,
                    HandshakeOutcome::Completed,
                )?;
                self.inner
                    .events
                    .publish(AuthEvent::signed_in(credentials.user_id.clone()));
                info!(
                    attempt_id = %attempt_id,
                    user_id = %credentials.user_id,
                    "Authorization handshake completed"
                );
                Ok(credentials)
            }
            Ok(PutOutcome::SupersededBySignOut) => {
                warn!(attempt_id = %attempt_id, "Sign-out overtook handshake completion");
                state.resolve(&HandshakeMachineInput::Cancel, HandshakeOutcome::Cancelled)?;
                self.inner
                    .events
                    .publish(AuthEvent::failed(FailureReason::Cancelled));
                Err(HandshakeError::SupersededBySignOut)
            }
            Err(e) => {
                warn!(attempt_id = %attempt_id, error = %e, "Session store refused credentials");
                state.resolve(
                    &HandshakeMachineInput::CallbackRejected,
                    HandshakeOutcome::Rejected,
                )?;
                self.inner
                    .events
                    .publish(AuthEvent::failed(FailureReason::Rejected));
                Err(HandshakeError::Storage(e))
            }
        }
    }

    /// Abort the pending attempt, if any. No-op when nothing is pending.
    pub async fn cancel(&self) -> HandshakeResult<()> {
        let mut state = self.inner.state.lock().await;

        let Some(attempt) = state.attempt.take() else {
            debug!("Cancel with no attempt pending");
            return Ok(());
        };

        info!(attempt_id = %attempt.keypair.attempt_id, "Authorization attempt cancelled");
        attempt.keypair.destroy();
        state.resolve(&HandshakeMachineInput::Cancel, HandshakeOutcome::Cancelled)?;
        self.inner
            .events
            .publish(AuthEvent::failed(FailureReason::Cancelled));
        Ok(())
    }

    /// Current phase, pending attempt and most recent outcome.
    pub async fn snapshot(&self) -> HandshakeSnapshot {
        let state = self.inner.state.lock().await;
        HandshakeSnapshot {
            phase: HandshakePhase::from(state.machine.state()),
            last_outcome: state.last_outcome,
            attempt_id: state.attempt.as_ref().map(|a| a.keypair.attempt_id),
            deadline: state.attempt.as_ref().map(|a| a.deadline),
        }
    }
}

impl ControllerInner {
    async fn expire(&self, generation: u64) {
        let mut state = self.state.lock().await;

        let still_pending = state
            .attempt
            .as_ref()
            .is_some_and(|attempt| attempt.generation == generation);
        if !still_pending {
            return;
        }
        let Some(attempt) = state.attempt.take() else {
            return;
        };

        warn!(attempt_id = %attempt.keypair.attempt_id, "Authorization attempt timed out");
        attempt.keypair.destroy();
        if let Err(e) = state.resolve(&HandshakeMachineInput::Deadline, HandshakeOutcome::TimedOut)
        {
            warn!(error = %e, "Deadline fired in an unexpected phase");
            return;
        }
        self.events
            .publish(AuthEvent::failed(FailureReason::TimedOut));
    }
}
