//! Post-sign-in intent replay.

use crate::{PendingIntentStore, Router};
use auth_events::{AuthEvent, AuthEventBus, AuthEventsError};
use session_vault::SessionVault;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Timing knobs for intent replay.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// How long the replaying flag stays held after a replay, so a burst
    /// of duplicate sign-in events cannot replay twice.
    pub grace_period: Duration,
    /// How long to wait for the stored session to read back as active
    /// before giving up on the replay.
    pub readiness_timeout: Duration,
    /// Poll interval while waiting for readiness.
    pub readiness_poll: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(5),
            readiness_timeout: Duration::from_secs(2),
            readiness_poll: Duration::from_millis(25),
        }
    }
}

/// Watches the event bus and replays the parked intent after sign-in.
///
/// Only `signed-in` triggers a replay; a refresh means the user never
/// left, so there is nothing to resume. The slot is cleared before
/// navigating, and navigation uses `replace` so Back does not return to
/// the sign-in screen.
pub struct IntentReplayCoordinator {
    task: JoinHandle<()>,
}

impl IntentReplayCoordinator {
    /// Spawn the coordinator on the current runtime. It runs until the
    /// bus closes, [`shutdown`](Self::shutdown) is called or the handle
    /// is dropped.
    pub fn spawn(
        events: AuthEventBus,
        vault: Arc<SessionVault>,
        store: Arc<PendingIntentStore>,
        router: Arc<dyn Router>,
        config: ReplayConfig,
    ) -> Self {
        let mut stream = events.subscribe();
        let replaying = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(async move {
            loop {
                match stream.recv().await {
                    Ok(AuthEvent::SignedIn { ref user_id, .. }) => {
                        debug!(user_id = %user_id, "Sign-in observed, checking for parked intent");
                        replay_once(&vault, &store, router.as_ref(), &replaying, &config).await;
                    }
                    // Refreshes, sign-outs and failures never navigate
                    Ok(_) => {}
                    Err(AuthEventsError::Lagged(skipped)) => {
                        warn!(skipped, "Replay coordinator lagged behind the event bus");
                    }
                    Err(AuthEventsError::Closed) => break,
                }
            }
        });

        Self { task }
    }

    /// Stop watching the bus.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for IntentReplayCoordinator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn replay_once(
    vault: &SessionVault,
    store: &PendingIntentStore,
    router: &dyn Router,
    replaying: &Arc<AtomicBool>,
    config: &ReplayConfig,
) {
    if replaying.load(Ordering::SeqCst) {
        debug!("Replay already in progress, ignoring sign-in");
        return;
    }
    let Some(intent) = store.get() else {
        debug!("No parked intent to replay");
        return;
    };

    replaying.store(true, Ordering::SeqCst);

    // The router's own auth guard reads the session store; navigate only
    // once the freshly stored session reads back, not after a blind delay.
    if !session_visible(vault, config).await {
        warn!(
            path = %intent.resolved_path,
            "Session never became readable, keeping intent for a later sign-in"
        );
        replaying.store(false, Ordering::SeqCst);
        return;
    }

    // Clear before navigating so a crash mid-navigation cannot replay
    // the same intent forever
    if let Err(err) = store.clear() {
        warn!(error = %err, "Could not clear parked intent, skipping replay");
        replaying.store(false, Ordering::SeqCst);
        return;
    }

    info!(path = %intent.resolved_path, "Replaying parked intent");
    if let Err(err) = router.replace(&intent.resolved_path) {
        // The slot is already empty; the user stays where they are
        error!(error = %err, path = %intent.resolved_path, "Intent replay navigation failed");
    }

    // Hold the flag through the grace period so duplicate sign-in events
    // are absorbed, then release for the next distinct sign-in
    let flag = Arc::clone(replaying);
    let grace = config.grace_period;
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        flag.store(false, Ordering::SeqCst);
    });
}

async fn session_visible(vault: &SessionVault, config: &ReplayConfig) -> bool {
    let deadline = tokio::time::Instant::now() + config.readiness_timeout;
    loop {
        if vault.get_active().is_some() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(config.readiness_poll).await;
    }
}
