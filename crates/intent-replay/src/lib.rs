//! Pending-intent capture and post-sign-in replay.
//!
//! When a signed-out user taps something that needs a session, the
//! [`SessionGate`] parks what they were trying to do as a
//! [`PendingIntent`] and sends them to sign-in. Once a `signed-in` event
//! lands on the bus, the [`IntentReplayCoordinator`] picks the parked
//! intent back up and navigates to it, so the user resumes where they
//! left off instead of on the home screen.

mod coordinator;
mod gate;
mod intent;
mod router;
mod store;

pub use coordinator::{IntentReplayCoordinator, ReplayConfig};
pub use gate::{Guarded, IntentSource, SessionGate};
pub use intent::PendingIntent;
pub use router::Router;
pub use store::PendingIntentStore;

use thiserror::Error;

/// Intent persistence and replay error type.
#[derive(Error, Debug)]
pub enum IntentError {
    /// Intent file could not be read or written
    #[error("Intent storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Intent record could not be encoded or decoded
    #[error("Intent encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Navigation to a route failed
    #[error("Navigation failed: {0}")]
    Navigation(String),
}

/// Result type alias using IntentError.
pub type IntentResult<T> = Result<T, IntentError>;
