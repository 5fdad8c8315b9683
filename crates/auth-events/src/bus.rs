//! Broadcast bus for session lifecycle events.

use crate::{AuthEvent, AuthEventsError};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default number of events retained per lagging subscriber.
pub const DEFAULT_CAPACITY: usize = 64;

/// Cloneable publish/subscribe handle for [`AuthEvent`]s.
///
/// Constructed once by the embedding application and injected into the
/// handshake controller, the replay coordinator, and any screens that care.
/// Events fan out to every live subscriber in publish order; subscribers
/// that arrive late start from the next event, not from history.
#[derive(Clone)]
pub struct AuthEventBus {
    event_tx: broadcast::Sender<AuthEvent>,
}

impl AuthEventBus {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self { event_tx }
    }

    /// Publish an event to all current subscribers. Publishing with no
    /// subscribers is a no-op.
    pub fn publish(&self, event: AuthEvent) {
        debug!(event = event.name(), "Publishing auth event");
        if self.event_tx.send(event).is_err() {
            debug!("No auth event subscribers, event dropped");
        }
    }

    /// Subscribe to events published after this call. Dropping the stream
    /// unsubscribes.
    pub fn subscribe(&self) -> AuthEvents {
        AuthEvents {
            rx: self.event_tx.subscribe(),
        }
    }

    /// Run `handler` for each event on a background task. The returned
    /// handle unsubscribes on [`SubscriptionHandle::unsubscribe`] or drop,
    /// which is how screens detach on unmount.
    pub fn subscribe_with<F>(&self, mut handler: F) -> SubscriptionHandle
    where
        F: FnMut(AuthEvent) + Send + 'static,
    {
        let mut rx = self.event_tx.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth event handler lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        SubscriptionHandle { task }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Ordered stream of events for one subscriber.
pub struct AuthEvents {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthEvents {
    /// Receive the next event.
    ///
    /// A lagging subscriber gets [`AuthEventsError::Lagged`] once, then
    /// resumes from the oldest retained event.
    pub async fn recv(&mut self) -> Result<AuthEvent, AuthEventsError> {
        match self.rx.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Auth event subscriber lagged, events dropped");
                Err(AuthEventsError::Lagged(skipped))
            }
            Err(broadcast::error::RecvError::Closed) => Err(AuthEventsError::Closed),
        }
    }
}

/// Detaches a [`AuthEventBus::subscribe_with`] handler when dropped.
pub struct SubscriptionHandle {
    task: tokio::task::JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
