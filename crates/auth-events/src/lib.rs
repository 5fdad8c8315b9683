//! Session lifecycle events for the Agora client.
//!
//! One [`AuthEventBus`] is created at startup and handed to everything that
//! needs to announce or observe session changes. Subscribers get events in
//! publish order and never see history; anything that needs to know the
//! current session state asks the vault, not the bus.

mod bus;
mod event;

pub use bus::{AuthEventBus, AuthEvents, SubscriptionHandle, DEFAULT_CAPACITY};
pub use event::{AuthEvent, FailureReason};

use thiserror::Error;

/// Error surfaced to event subscribers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthEventsError {
    /// The subscriber fell behind and `n` events were dropped. The stream
    /// resumes from the oldest retained event on the next receive.
    #[error("Subscriber lagged, {0} events dropped")]
    Lagged(u64),

    /// The bus and every publisher handle were dropped.
    #[error("Event bus closed")]
    Closed,
}
