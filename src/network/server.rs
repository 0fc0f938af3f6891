use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::network::peer::{PeerId, PeerInfo};
use crate::utils::{DptError, Result};

/// Events surfaced by the discovery transport.
#[derive(Clone, Debug)]
pub enum ServerEvent {
    Listening,
    Close,
    Error(DptError),
    /// Neighbours received in response to an earlier `find_neighbours`.
    Peers(Vec<PeerInfo>),
}

/// The UDP discovery transport the coordinator drives.
///
/// The wire codec, socket handling and ping timeout live behind this
/// seam; the coordinator only sees confirmed peers and events.
#[async_trait]
pub trait DiscoveryServer: Send + Sync {
    /// Bind the underlying socket. Emits [`ServerEvent::Listening`] once
    /// bound.
    async fn bind(&self, address: &str, port: u16) -> Result<()>;

    /// Probe a peer for liveness. Resolves with the peer's populated
    /// identity on pong, errs on timeout or transport failure.
    async fn ping(&self, peer: &PeerInfo) -> Result<PeerInfo>;

    /// Ask a peer for the nodes closest to `target`. Fire-and-forget;
    /// results surface later as a [`ServerEvent::Peers`] event.
    async fn find_neighbours(&self, peer: &PeerInfo, target: &PeerId);

    /// Tear down the socket. Emits [`ServerEvent::Close`].
    async fn close(&self);

    /// Register for transport events.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerEvent>;
}
