//! Peer discovery core
//!
//! A Kademlia-inspired routing table, a time-bounded ban list and the
//! DPT coordinator that owns both, probing candidates over a UDP
//! discovery server and optionally ingesting signed DNS peer lists.

pub mod banlist;
pub mod dns;
pub mod dpt;
pub mod events;
pub mod kbucket;
pub mod peer;
pub mod server;

pub use banlist::{BanList, DEFAULT_BAN_DURATION};
pub use dns::{DnsOptions, DnsProvider};
pub use dpt::{Dpt, DptOptions};
pub use events::{DptEvent, DptEventKind, EventBus};
pub use kbucket::{KBucket, KBucketEvent, BUCKET_SIZE};
pub use peer::{PeerId, PeerInfo};
pub use server::{DiscoveryServer, ServerEvent};
