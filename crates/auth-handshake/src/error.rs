//! Handshake error types.

use handshake_crypto::PayloadError;
use thiserror::Error;
use uuid::Uuid;

/// Handshake error type.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Key generation or other crypto primitive failure
    #[error("Crypto error: {0}")]
    Crypto(#[from] handshake_crypto::CryptoError),

    /// Callback payload could not be decoded, decrypted or validated
    #[error("Payload refused: {0}")]
    Payload(#[from] PayloadError),

    /// Callback names an attempt that is not the pending one
    #[error("Callback answers attempt {received}, which is not pending")]
    AttemptMismatch { received: Uuid },

    /// Callback arrived with no attempt in flight
    #[error("No authorization attempt is pending")]
    NoPendingAttempt,

    /// Deep link does not have the shape of an authorization callback
    #[error("Malformed callback: {0}")]
    MalformedCallback(String),

    /// The authorization page could not be opened
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Invalid state transition in the handshake FSM
    #[error("Invalid handshake state transition: {0}")]
    InvalidTransition(String),

    /// Session storage error
    #[error("Storage error: {0}")]
    Storage(#[from] session_vault::StoreError),

    /// A sign-out overtook this credential write
    #[error("Superseded by sign-out")]
    SupersededBySignOut,

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl HandshakeError {
    /// Returns true if this failure should be dropped quietly rather than
    /// surfaced as an error dialog.
    ///
    /// Stale, foreign or malformed callbacks fall in this bucket: they do
    /// not belong to the pending attempt, so the user never asked for the
    /// operation that failed.
    pub fn is_silent_rejection(&self) -> bool {
        matches!(
            self,
            HandshakeError::AttemptMismatch { .. }
                | HandshakeError::NoPendingAttempt
                | HandshakeError::MalformedCallback(_)
                | HandshakeError::Payload(PayloadError::Malformed(_))
        )
    }
}

/// Result type alias using HandshakeError.
pub type HandshakeResult<T> = Result<T, HandshakeError>;
