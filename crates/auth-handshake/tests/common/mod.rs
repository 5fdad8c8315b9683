//! Shared fixtures for handshake integration tests.

use auth_events::{AuthEvent, AuthEventBus, AuthEvents};
use auth_handshake::{
    AuthorizeRequest, ExternalAuthorizer, HandshakeConfig, HandshakeController, HandshakeError,
    HandshakeResult, SessionLifecycle,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use handshake_crypto::seal_credentials;
use session_vault::{SecureStorage, SessionCredentials, SessionVault, StoreError, StoreResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

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

/// Storage that refuses writes but answers reads, for fail-closed paths.
pub struct WriteRefusedStorage;

impl SecureStorage for WriteRefusedStorage {
    fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::Backend("write refused".to_string()))
    }

    fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Ok(None)
    }

    fn delete(&self, _key: &str) -> StoreResult<bool> {
        Ok(false)
    }
}

/// Records every request it is asked to open.
#[derive(Default)]
pub struct RecordingAuthorizer {
    pub requests: Mutex<Vec<AuthorizeRequest>>,
}

impl ExternalAuthorizer for RecordingAuthorizer {
    fn open(&self, request: &AuthorizeRequest) -> HandshakeResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Always fails to open, as when no browser is installed.
pub struct FailingAuthorizer;

impl ExternalAuthorizer for FailingAuthorizer {
    fn open(&self, _request: &AuthorizeRequest) -> HandshakeResult<()> {
        Err(HandshakeError::Launch("no browser available".to_string()))
    }
}

pub struct Harness {
    pub controller: HandshakeController,
    pub lifecycle: SessionLifecycle,
    pub vault: Arc<SessionVault>,
    pub events: AuthEventBus,
    pub authorizer: Arc<RecordingAuthorizer>,
}

pub fn harness() -> Harness {
    let vault = Arc::new(SessionVault::new(Box::new(MemoryStorage::new())));
    let events = AuthEventBus::default();
    let authorizer = Arc::new(RecordingAuthorizer::default());
    let controller = HandshakeController::new(
        HandshakeConfig::default(),
        Arc::clone(&vault),
        events.clone(),
        Arc::clone(&authorizer) as Arc<dyn ExternalAuthorizer>,
    );
    let lifecycle = SessionLifecycle::new(Arc::clone(&vault), events.clone());
    Harness {
        controller,
        lifecycle,
        vault,
        events,
        authorizer,
    }
}

pub fn credentials(user_id: &str) -> SessionCredentials {
    SessionCredentials {
        user_id: user_id.to_string(),
        access_token: format!("token-{user_id}"),
        refresh_token: Some(format!("refresh-{user_id}")),
        issued_at: Utc::now(),
        expires_at: Utc::now() + chrono::Duration::hours(2),
    }
}

/// The attempt public key the authorize URL carries.
pub fn public_key_of(request: &AuthorizeRequest) -> [u8; 32] {
    let value = request
        .url
        .query_pairs()
        .find(|(key, _)| key == "publicKey")
        .map(|(_, value)| value.into_owned())
        .expect("authorize URL has no publicKey");
    let bytes = BASE64.decode(value.as_bytes()).expect("publicKey not base64");
    bytes.as_slice().try_into().expect("publicKey not 32 bytes")
}

fn callback_url(attempt_id: Uuid, payload: &str, nonce: &str) -> String {
    let mut url = Url::parse("agora://authorize/callback").unwrap();
    url.query_pairs_mut()
        .append_pair("attemptId", &attempt_id.to_string())
        .append_pair("payload", payload)
        .append_pair("nonce", nonce);
    url.to_string()
}

/// A deep link answering `request` with `credentials`, sealed the way the
/// forum would seal them.
pub fn callback_for(request: &AuthorizeRequest, credentials: &SessionCredentials) -> String {
    let public_key = public_key_of(request);
    let sealed =
        seal_credentials(credentials, &public_key, request.attempt_id).expect("sealing failed");
    let (payload, nonce) = sealed.to_parts();
    callback_url(request.attempt_id, &payload, &nonce)
}

/// A well-shaped deep link whose payload is random bytes.
pub fn garbage_callback(attempt_id: Uuid) -> String {
    let payload = BASE64.encode([7u8; 64]);
    let nonce = BASE64.encode([9u8; 12]);
    callback_url(attempt_id, &payload, &nonce)
}

pub async fn next_event(events: &mut AuthEvents) -> AuthEvent {
    tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("expected an event within 1s")
        .expect("event bus closed")
}

pub async fn assert_no_event(events: &mut AuthEvents) {
    let outcome = tokio::time::timeout(Duration::from_millis(50), events.recv()).await;
    assert!(outcome.is_err(), "expected no further events: {outcome:?}");
}
