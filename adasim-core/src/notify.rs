//! Per-owner publish/subscribe fan-out for real-time client events.

use adasim_model::{ClientEvent, UserId};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

const DISPATCH_QUEUE_CAPACITY: usize = 1024;
const SESSION_CHANNEL_CAPACITY: usize = 64;

enum Envelope {
    Event(UserId, ClientEvent),
    Shutdown,
}

/// Fan-out hub for pushing events to an owner's connected sessions.
///
/// Publishing is fire-and-forget and non-blocking: events enter an
/// internal bounded queue and a dispatcher task forwards them to the
/// owner's broadcast channel. Owners with no connected session miss the
/// event; there is no queue, retry, or replay for them. Every connected
/// session of an owner receives each event at most once.
///
/// One instance is constructed at process start and injected wherever
/// events are published.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Envelope>,
    channels: Arc<DashMap<UserId, broadcast::Sender<ClientEvent>>>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("owner_channels", &self.channels.len())
            .field("queue_closed", &self.tx.is_closed())
            .finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(DISPATCH_QUEUE_CAPACITY);
        let channels: Arc<DashMap<UserId, broadcast::Sender<ClientEvent>>> =
            Arc::new(DashMap::new());

        tokio::spawn(dispatch_loop(rx, Arc::clone(&channels)));

        Self { tx, channels }
    }

    /// Queue an event for every currently-connected session of `owner`.
    ///
    /// Never blocks the caller; a full or closed queue drops the event
    /// with a warning.
    pub fn publish(&self, owner: UserId, event: ClientEvent) {
        if let Err(e) = self.tx.try_send(Envelope::Event(owner, event)) {
            warn!(%owner, "dropping event, dispatch queue unavailable: {e}");
        }
    }

    /// Register a session for `owner` and return its event stream.
    pub fn subscribe(&self, owner: UserId) -> broadcast::Receiver<ClientEvent> {
        self.channels
            .entry(owner)
            .or_insert_with(|| {
                broadcast::channel(SESSION_CHANNEL_CAPACITY).0
            })
            .subscribe()
    }

    /// Stop the dispatcher and drop all per-owner channels, ending every
    /// subscriber stream. Events published afterwards are dropped.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Envelope::Shutdown).await;
    }
}

async fn dispatch_loop(
    mut rx: mpsc::Receiver<Envelope>,
    channels: Arc<DashMap<UserId, broadcast::Sender<ClientEvent>>>,
) {
    while let Some(envelope) = rx.recv().await {
        match envelope {
            Envelope::Event(owner, event) => {
                let delivered = channels
                    .get(&owner)
                    .map(|tx| tx.send(event).is_ok())
                    .unwrap_or(false);
                if !delivered {
                    // No connected session; at-most-once means the event
                    // is simply gone.
                    debug!(%owner, "event dropped, owner has no sessions");
                    channels
                        .remove_if(&owner, |_, tx| tx.receiver_count() == 0);
                }
            }
            Envelope::Shutdown => break,
        }
    }
    channels.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use adasim_model::{RunId, RunStatus, RunSummary};
    use std::time::Duration;
    use tokio::time::timeout;

    fn status_event() -> ClientEvent {
        ClientEvent::RunStatusChanged {
            run_id: RunId::new(),
            status: RunStatus::Completed,
            summary: RunSummary::default(),
            video_ref: None,
        }
    }

    async fn recv(
        rx: &mut broadcast::Receiver<ClientEvent>,
    ) -> Option<ClientEvent> {
        timeout(Duration::from_secs(1), rx.recv()).await.ok()?.ok()
    }

    #[tokio::test]
    async fn all_sessions_of_an_owner_receive_the_event() {
        let notifier = Notifier::new();
        let owner = UserId::new();
        let mut first = notifier.subscribe(owner);
        let mut second = notifier.subscribe(owner);

        notifier.publish(owner, status_event());

        assert!(recv(&mut first).await.is_some());
        assert!(recv(&mut second).await.is_some());
    }

    #[tokio::test]
    async fn other_owners_do_not_receive_the_event() {
        let notifier = Notifier::new();
        let owner = UserId::new();
        let bystander = UserId::new();
        let mut own = notifier.subscribe(owner);
        let mut other = notifier.subscribe(bystander);

        notifier.publish(owner, status_event());

        assert!(recv(&mut own).await.is_some());
        assert!(
            timeout(Duration::from_millis(200), other.recv())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn publishing_without_sessions_is_a_silent_drop() {
        let notifier = Notifier::new();
        // No subscriber exists; publish must not error or block.
        notifier.publish(UserId::new(), status_event());
    }

    #[tokio::test]
    async fn shutdown_closes_subscriber_streams() {
        let notifier = Notifier::new();
        let owner = UserId::new();
        let mut rx = notifier.subscribe(owner);

        notifier.shutdown().await;

        let outcome = timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(matches!(
            outcome,
            Ok(Err(broadcast::error::RecvError::Closed))
        ));
    }

    #[tokio::test]
    async fn publish_after_shutdown_is_a_no_op() {
        let notifier = Notifier::new();
        notifier.shutdown().await;

        notifier.publish(UserId::new(), status_event());
    }
}
