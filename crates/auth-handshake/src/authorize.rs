//! Authorization request construction and browser launching.

use crate::{HandshakeConfig, HandshakeResult};
use handshake_crypto::AttemptKeyPair;
use url::Url;
use uuid::Uuid;

/// A fully formed authorization request, ready to hand to the browser.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    /// Attempt this request belongs to.
    pub attempt_id: Uuid,
    /// Forum authorization page, with the attempt's public key attached.
    pub url: Url,
}

impl AuthorizeRequest {
    /// Build the forum authorization URL for `keypair`.
    ///
    /// The forum seals issued credentials to the `publicKey` parameter
    /// and calls back on the `callback` deep link with the `attemptId`
    /// echoed, so the URL carries everything the server side needs.
    pub fn build(config: &HandshakeConfig, keypair: &AttemptKeyPair) -> HandshakeResult<Self> {
        let mut url = Url::parse(&format!("{}/auth/authorize", config.forum_url))?;
        url.query_pairs_mut()
            .append_pair("attemptId", &keypair.attempt_id.to_string())
            .append_pair("publicKey", &keypair.public_key_base64())
            .append_pair("application", &config.application_name)
            .append_pair("scopes", &config.scopes.join(","))
            .append_pair(
                "callback",
                &format!("{}://authorize/callback", config.callback_scheme),
            );

        Ok(Self {
            attempt_id: keypair.attempt_id,
            url,
        })
    }
}

/// Opens authorization requests in an external user agent.
///
/// The mobile shell implements this with the system browser or an in-app
/// browser tab. Opening is fire-and-forget: the result of the
/// authorization comes back later as a deep link, never through this
/// call.
pub trait ExternalAuthorizer: Send + Sync {
    fn open(&self, request: &AuthorizeRequest) -> HandshakeResult<()>;
}
