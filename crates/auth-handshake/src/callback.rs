//! Deep link callback parsing.

use crate::{HandshakeError, HandshakeResult};
use handshake_crypto::EncryptedPayload;
use url::Url;
use uuid::Uuid;

const CALLBACK_HOST: &str = "authorize";
const CALLBACK_PATH: &str = "/callback";

/// Parse an authorization deep link into the payload it carries.
///
/// Strict on shape: the scheme, host and path must match the callback
/// route the forum was asked to use, and the `attemptId`, `payload` and
/// `nonce` query parameters must all be present and well formed.
/// Anything else is refused here, before any handshake state is touched.
pub fn parse_callback(raw: &str, expected_scheme: &str) -> HandshakeResult<EncryptedPayload> {
    let url = Url::parse(raw)
        .map_err(|e| HandshakeError::MalformedCallback(format!("not a URL: {e}")))?;

    if url.scheme() != expected_scheme {
        return Err(HandshakeError::MalformedCallback(format!(
            "unexpected scheme {:?}",
            url.scheme()
        )));
    }
    if url.host_str() != Some(CALLBACK_HOST) || url.path() != CALLBACK_PATH {
        return Err(HandshakeError::MalformedCallback(format!(
            "unexpected callback route {:?}{}",
            url.host_str(),
            url.path()
        )));
    }

    let mut attempt_id = None;
    let mut payload = None;
    let mut nonce = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "attemptId" => attempt_id = Some(value.into_owned()),
            "payload" => payload = Some(value.into_owned()),
            "nonce" => nonce = Some(value.into_owned()),
            _ => {}
        }
    }

    let attempt_id = attempt_id
        .ok_or_else(|| HandshakeError::MalformedCallback("missing attemptId".to_string()))?;
    let payload =
        payload.ok_or_else(|| HandshakeError::MalformedCallback("missing payload".to_string()))?;
    let nonce =
        nonce.ok_or_else(|| HandshakeError::MalformedCallback("missing nonce".to_string()))?;

    let attempt_id = Uuid::parse_str(&attempt_id).map_err(|_| {
        HandshakeError::MalformedCallback(format!("attemptId is not a UUID: {attempt_id}"))
    })?;

    Ok(EncryptedPayload::from_parts(attempt_id, &payload, &nonce)?)
}
