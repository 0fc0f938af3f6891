//! Mini DPT
//!
//! A Kademlia-style distributed peer table (DPT) for devp2p-flavoured
//! peer discovery, plus the Ethereum account and address primitives the
//! node identity is derived from.

pub mod core;
pub mod network;
pub mod utils;

// Re-export main types
pub use core::{Account, KECCAK256_NULL, KECCAK256_RLP};
pub use network::{
    BanList, DiscoveryServer, DnsOptions, DnsProvider, Dpt, DptEvent, DptEventKind, DptOptions,
    KBucket, KBucketEvent, PeerId, PeerInfo, ServerEvent, BUCKET_SIZE,
};
pub use utils::error::{DptError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
