//! Shared fixtures for intent replay integration tests.

use auth_events::AuthEventBus;
use auth_handshake::{AuthorizeRequest, ExternalAuthorizer, HandshakeResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use handshake_crypto::seal_credentials;
use intent_replay::{
    IntentError, IntentReplayCoordinator, IntentResult, PendingIntentStore, ReplayConfig, Router,
    SessionGate,
};
use session_vault::{SecureStorage, SessionCredentials, SessionVault, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub struct MemoryStorage {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl SecureStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }
}

/// Records navigations and, at each replace, whether the intent slot had
/// already been cleared.
pub struct ObservingRouter {
    store: Arc<PendingIntentStore>,
    fail_replace: bool,
    pub pushes: Mutex<Vec<String>>,
    pub replaces: Mutex<Vec<(String, bool)>>,
}

impl ObservingRouter {
    pub fn new(store: Arc<PendingIntentStore>) -> Self {
        Self {
            store,
            fail_replace: false,
            pushes: Mutex::new(Vec::new()),
            replaces: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(store: Arc<PendingIntentStore>) -> Self {
        Self {
            fail_replace: true,
            ..Self::new(store)
        }
    }

    pub fn replace_count(&self) -> usize {
        self.replaces.lock().unwrap().len()
    }

    pub fn replace_paths(&self) -> Vec<String> {
        self.replaces
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl Router for ObservingRouter {
    fn push(&self, path: &str) -> IntentResult<()> {
        self.pushes.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn replace(&self, path: &str) -> IntentResult<()> {
        let slot_empty = self.store.get().is_none();
        self.replaces
            .lock()
            .unwrap()
            .push((path.to_string(), slot_empty));
        if self.fail_replace {
            return Err(IntentError::Navigation("route not mounted".to_string()));
        }
        Ok(())
    }
}

/// Opens nothing; the tests drive callbacks through the controller.
pub struct NoopAuthorizer;

impl ExternalAuthorizer for NoopAuthorizer {
    fn open(&self, _request: &AuthorizeRequest) -> HandshakeResult<()> {
        Ok(())
    }
}

pub struct ReplayHarness {
    pub vault: Arc<SessionVault>,
    pub store: Arc<PendingIntentStore>,
    pub router: Arc<ObservingRouter>,
    pub bus: AuthEventBus,
    _dir: tempfile::TempDir,
}

impl ReplayHarness {
    pub fn spawn_coordinator(&self) -> IntentReplayCoordinator {
        IntentReplayCoordinator::spawn(
            self.bus.clone(),
            Arc::clone(&self.vault),
            Arc::clone(&self.store),
            Arc::clone(&self.router) as Arc<dyn Router>,
            ReplayConfig::default(),
        )
    }

    pub fn gate(&self, sign_in_path: &str) -> SessionGate {
        SessionGate::new(
            Arc::clone(&self.vault),
            Arc::clone(&self.store),
            Arc::clone(&self.router) as Arc<dyn Router>,
            sign_in_path,
        )
    }
}

pub fn replay_harness() -> ReplayHarness {
    build_harness(false)
}

pub fn replay_harness_with_failing_nav() -> ReplayHarness {
    build_harness(true)
}

fn build_harness(fail_replace: bool) -> ReplayHarness {
    let dir = tempfile::tempdir().expect("tempdir");
    let vault = Arc::new(SessionVault::new(Box::new(MemoryStorage::new())));
    let store = Arc::new(PendingIntentStore::new(dir.path().join("intent.json")));
    let router = if fail_replace {
        Arc::new(ObservingRouter::failing(Arc::clone(&store)))
    } else {
        Arc::new(ObservingRouter::new(Arc::clone(&store)))
    };
    ReplayHarness {
        vault,
        store,
        router,
        bus: AuthEventBus::default(),
        _dir: dir,
    }
}

pub fn credentials(user_id: &str) -> SessionCredentials {
    SessionCredentials {
        user_id: user_id.to_string(),
        access_token: format!("token-{user_id}"),
        refresh_token: None,
        issued_at: Utc::now(),
        expires_at: Utc::now() + chrono::Duration::hours(2),
    }
}

pub fn expired_credentials(user_id: &str) -> SessionCredentials {
    SessionCredentials {
        expires_at: Utc::now() - chrono::Duration::minutes(5),
        ..credentials(user_id)
    }
}

/// A deep link answering `request` with `credentials`, sealed the way
/// the forum would seal them.
pub fn callback_for(request: &AuthorizeRequest, credentials: &SessionCredentials) -> String {
    let public_key = request
        .url
        .query_pairs()
        .find(|(key, _)| key == "publicKey")
        .map(|(_, value)| value.into_owned())
        .expect("authorize URL has no publicKey");
    let public_key: [u8; 32] = BASE64
        .decode(public_key.as_bytes())
        .expect("publicKey not base64")
        .as_slice()
        .try_into()
        .expect("publicKey not 32 bytes");

    let sealed =
        seal_credentials(credentials, &public_key, request.attempt_id).expect("sealing failed");
    let (payload, nonce) = sealed.to_parts();

    let mut url = Url::parse("agora://authorize/callback").unwrap();
    url.query_pairs_mut()
        .append_pair("attemptId", &request.attempt_id.to_string())
        .append_pair("payload", &payload)
        .append_pair("nonce", &nonce);
    url.to_string()
}

/// Poll until `condition` holds, driving the runtime in between.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

/// Give background tasks `polls` scheduling opportunities.
pub async fn settle(polls: u32) {
    for _ in 0..polls {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
