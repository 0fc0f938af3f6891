use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::network::peer::PeerInfo;
use crate::utils::DptError;

/// Lifecycle and table events emitted by the coordinator.
#[derive(Clone, Debug)]
pub enum DptEvent {
    Listening,
    Close,
    Error(DptError),
    /// A peer entered the routing table.
    PeerAdded(PeerInfo),
    /// A peer left the routing table.
    PeerRemoved(PeerInfo),
    /// First successful liveness confirmation, fired before insertion.
    PeerNew(PeerInfo),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DptEventKind {
    Listening,
    Close,
    Error,
    PeerAdded,
    PeerRemoved,
    PeerNew,
}

impl DptEvent {
    pub fn kind(&self) -> DptEventKind {
        match self {
            DptEvent::Listening => DptEventKind::Listening,
            DptEvent::Close => DptEventKind::Close,
            DptEvent::Error(_) => DptEventKind::Error,
            DptEvent::PeerAdded(_) => DptEventKind::PeerAdded,
            DptEvent::PeerRemoved(_) => DptEventKind::PeerRemoved,
            DptEvent::PeerNew(_) => DptEventKind::PeerNew,
        }
    }
}

/// Fan-out event sink replacing the EventEmitter pattern: observers
/// subscribe to everything or to a single event kind and receive events
/// over an unbounded channel. Subscribers that went away are dropped on
/// the next emit.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

struct Subscriber {
    kind: Option<DptEventKind>,
    sender: mpsc::UnboundedSender<DptEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DptEvent> {
        self.register(None)
    }

    /// Receive only events of one kind.
    pub fn subscribe_kind(&self, kind: DptEventKind) -> mpsc::UnboundedReceiver<DptEvent> {
        self.register(Some(kind))
    }

    fn register(&self, kind: Option<DptEventKind>) -> mpsc::UnboundedReceiver<DptEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("event bus lock poisoned")
            .push(Subscriber { kind, sender });
        receiver
    }

    pub(crate) fn emit(&self, event: DptEvent) {
        let mut subscribers = self.subscribers.lock().expect("event bus lock poisoned");
        subscribers.retain(|subscriber| {
            if subscriber.kind.is_some_and(|kind| kind != event.kind()) {
                return !subscriber.sender.is_closed();
            }
            subscriber.sender.send(event.clone()).is_ok()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_all() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(DptEvent::Listening);
        bus.emit(DptEvent::Close);

        assert!(matches!(rx.recv().await, Some(DptEvent::Listening)));
        assert!(matches!(rx.recv().await, Some(DptEvent::Close)));
    }

    #[tokio::test]
    async fn test_subscribe_kind_filters() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_kind(DptEventKind::PeerAdded);

        bus.emit(DptEvent::Listening);
        bus.emit(DptEvent::PeerAdded(PeerInfo::default()));

        assert!(matches!(rx.recv().await, Some(DptEvent::PeerAdded(_))));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);

        bus.emit(DptEvent::Listening);
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }
}
