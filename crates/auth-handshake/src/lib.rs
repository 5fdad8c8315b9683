//! Browser-mediated authorization handshake for the Agora mobile client.
//!
//! This crate provides:
//! - Per-attempt X25519 keypairs handed to the forum's authorization page
//! - Deep link callback parsing and payload decryption
//! - Explicit FSM-based handshake phases with replace-on-begin semantics
//! - Session lifecycle operations (refresh application, sign-out)
//!
//! The flow: [`HandshakeController::begin`] mints a keypair and opens the
//! forum's authorization page in an external browser. The forum seals the
//! issued credentials to that key and calls back over a deep link, which
//! the shell feeds to [`HandshakeController::handle_callback`]. Credentials
//! land in the [`session_vault`] and a `signed-in` event goes out on the
//! [`auth_events`] bus.

mod authorize;
mod callback;
mod config;
mod controller;
mod error;
mod handshake_fsm;
mod lifecycle;

pub use authorize::{AuthorizeRequest, ExternalAuthorizer};
pub use callback::parse_callback;
pub use config::{
    HandshakeConfig, DEFAULT_CALLBACK_SCHEME, DEFAULT_FORUM_URL, DEFAULT_TIMEOUT_SECS,
};
pub use controller::{HandshakeController, HandshakeSnapshot};
pub use error::{HandshakeError, HandshakeResult};
pub use handshake_fsm::handshake_machine;
pub use handshake_fsm::{
    HandshakeMachine, HandshakeMachineInput, HandshakeMachineState, HandshakeOutcome,
    HandshakePhase,
};
pub use lifecycle::{SessionLifecycle, SessionSnapshot};
