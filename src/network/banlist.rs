use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::network::peer::PeerInfo;

/// Default ban duration applied to unresponsive or rejected peers.
pub const DEFAULT_BAN_DURATION: Duration = Duration::from_secs(5 * 60);

/// Time-bounded denial set.
///
/// A banned peer is recorded under every identifier it is known by (id,
/// address, `address:udpPort`), so a later sighting under any of them is
/// still covered. Expired entries are purged lazily on lookup.
#[derive(Default)]
pub struct BanList {
    entries: HashMap<String, Instant>,
}

impl BanList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ban a peer until `max_age` from now (default 5 minutes).
    pub fn add(&mut self, peer: &PeerInfo, max_age: Option<Duration>) {
        let expires_at = Instant::now() + max_age.unwrap_or(DEFAULT_BAN_DURATION);
        for key in peer.keys() {
            self.entries.insert(key, expires_at);
        }
        debug!("banned peer {peer}");
    }

    /// True iff a non-expired ban covers any identifier of `peer`.
    pub fn has(&mut self, peer: &PeerInfo) -> bool {
        let now = Instant::now();
        self.entries.retain(|_, expires_at| *expires_at > now);
        peer.keys().iter().any(|key| self.entries.contains_key(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
