use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::network::peer::PeerInfo;
use crate::utils::Result;

/// Configuration handed to DNS provider implementations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DnsOptions {
    /// Resolver endpoint queried for ENR tree records.
    pub dns_server_address: String,
}

/// A source of peers drawn from signed DNS peer lists (EIP-1459).
///
/// Implementations resolve ENR tree domains, verify the records and hand
/// back at most `max` confirmed peer identities per call.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn get_peers(&self, max: usize, networks: &[String]) -> Result<Vec<PeerInfo>>;
}
