use serde::{Deserialize, Serialize};
use std::fmt;

use alloy_primitives::B512;

/// 64-byte node identity: the uncompressed secp256k1 public key minus the
/// 0x04 tag.
pub type PeerId = B512;

/// The identity record of a remote node.
///
/// The id is unknown until first contact; ports are learned from pongs and
/// ENR records. A peer is identified by its id when present, else by its
/// `(address, udp_port)` endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: Option<PeerId>,
    pub address: Option<String>,
    pub udp_port: Option<u16>,
    pub tcp_port: Option<u16>,
}

impl PeerInfo {
    /// A peer known only by its UDP endpoint, as given to `bootstrap`.
    pub fn from_endpoint(address: impl Into<String>, udp_port: u16) -> Self {
        Self {
            address: Some(address.into()),
            udp_port: Some(udp_port),
            ..Default::default()
        }
    }

    /// A peer known by its full identity.
    pub fn with_id(mut self, id: PeerId) -> Self {
        self.id = Some(id);
        self
    }

    /// Every identifier key this peer is reachable under, most precise
    /// first: the id hex, `address:udpPort`, the bare address. Ban list
    /// and routing table indexes are maintained under all of them.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(3);
        if let Some(id) = &self.id {
            keys.push(hex::encode(id));
        }
        if let Some(address) = &self.address {
            if let Some(port) = self.udp_port {
                keys.push(format!("{address}:{port}"));
            }
            keys.push(address.clone());
        }
        keys
    }

    /// Two peers are equivalent when any identifier matches.
    pub fn matches(&self, other: &PeerInfo) -> bool {
        if let (Some(a), Some(b)) = (&self.id, &other.id) {
            if a == b {
                return true;
            }
        }
        match (&self.address, &other.address) {
            (Some(a), Some(b)) if a == b => self.udp_port == other.udp_port,
            _ => false,
        }
    }
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.address, self.udp_port) {
            (Some(address), Some(port)) => write!(f, "{address}:{port}")?,
            (Some(address), None) => write!(f, "{address}")?,
            _ => write!(f, "<unknown endpoint>")?,
        }
        if let Some(id) = &self.id {
            write!(f, " (id: {}...)", &hex::encode(&id[..4]))?;
        }
        Ok(())
    }
}
