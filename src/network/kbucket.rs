use log::debug;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use alloy_primitives::{keccak256, B256};
use tokio::sync::mpsc;

use crate::network::peer::{PeerId, PeerInfo};

/// Entries per bucket (the Kademlia K parameter).
pub const BUCKET_SIZE: usize = 16;

const MAX_BUCKETS: usize = 256;

/// Events posted by the routing table. `Added` and `Removed` are
/// observational; `Ping` is a contract the owner must resolve by probing
/// the old candidates and calling back with [`KBucket::add`] or
/// [`KBucket::remove`].
#[derive(Clone, Debug)]
pub enum KBucketEvent {
    Added(PeerInfo),
    Removed(PeerInfo),
    Ping {
        /// Current occupants of the full bucket, oldest first.
        old_peers: Vec<PeerInfo>,
        new_peer: PeerInfo,
    },
}

/// Map a 64-byte node id into the 256-bit bucket key space.
pub(crate) fn bucket_key(id: &PeerId) -> B256 {
    keccak256(id)
}

fn xor_distance(a: &B256, b: &B256) -> B256 {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a[i] ^ b[i];
    }
    B256::from(out)
}

fn common_prefix_len(a: &B256, b: &B256) -> usize {
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = x ^ y;
        if diff != 0 {
            return i * 8 + diff.leading_zeros() as usize;
        }
    }
    256
}

struct Entry {
    peer: PeerInfo,
    key: B256,
    last_seen: Instant,
}

/// One XOR-distance range. Front is the oldest entry, back the newest.
struct Bucket {
    entries: VecDeque<Entry>,
}

impl Bucket {
    fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

/// Kademlia-style routing table keyed by XOR distance to the local node.
///
/// Bucket `i` holds peers whose key shares exactly `i` leading bits with
/// the local key; the final bucket is the catch-all for everything
/// closer. On overflow only the catch-all splits (the canonical
/// split-along-own-prefix rule), so every other bucket resolves overflow
/// through the ping/stale-eviction contract instead.
pub struct KBucket {
    local_key: B256,
    buckets: Vec<Bucket>,
    index: HashMap<String, PeerId>,
    events: mpsc::UnboundedSender<KBucketEvent>,
}

impl KBucket {
    /// Create a table centred on `local_id`, returning the event stream
    /// the owner must drain.
    pub fn new(local_id: &PeerId) -> (Self, mpsc::UnboundedReceiver<KBucketEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (
            Self {
                local_key: bucket_key(local_id),
                buckets: vec![Bucket::new()],
                index: HashMap::new(),
                events,
            },
            receiver,
        )
    }

    fn bucket_index(&self, key: &B256) -> usize {
        common_prefix_len(&self.local_key, key).min(self.buckets.len() - 1)
    }

    /// Add or refresh a peer.
    ///
    /// A peer already present is moved to the newest slot with its record
    /// refreshed. On overflow the catch-all splits; a fixed bucket posts
    /// a [`KBucketEvent::Ping`] instead and leaves the decision to the
    /// owner.
    pub fn add(&mut self, peer: &PeerInfo) {
        let Some(id) = peer.id else {
            debug!("ignoring peer without id: {peer}");
            return;
        };
        let key = bucket_key(&id);
        if key == self.local_key {
            // Never track ourselves
            return;
        }

        loop {
            let last = self.buckets.len() - 1;
            let idx = self.bucket_index(&key);

            if let Some(pos) = self.buckets[idx]
                .entries
                .iter()
                .position(|entry| entry.peer.id == Some(id))
            {
                if let Some(mut entry) = self.buckets[idx].entries.remove(pos) {
                    for old_key in entry.peer.keys() {
                        self.index.remove(&old_key);
                    }
                    entry.peer = peer.clone();
                    entry.last_seen = Instant::now();
                    for index_key in entry.peer.keys() {
                        self.index.insert(index_key, id);
                    }
                    self.buckets[idx].entries.push_back(entry);
                }
                return;
            }

            if self.buckets[idx].entries.len() < BUCKET_SIZE {
                self.buckets[idx].entries.push_back(Entry {
                    peer: peer.clone(),
                    key,
                    last_seen: Instant::now(),
                });
                for index_key in peer.keys() {
                    self.index.insert(index_key, id);
                }
                debug!("added peer {peer} to bucket {idx}");
                let _ = self.events.send(KBucketEvent::Added(peer.clone()));
                return;
            }

            if idx == last && self.buckets.len() < MAX_BUCKETS {
                self.split_catch_all();
                continue;
            }

            let old_peers = self.buckets[idx]
                .entries
                .iter()
                .map(|entry| entry.peer.clone())
                .collect();
            let _ = self.events.send(KBucketEvent::Ping {
                old_peers,
                new_peer: peer.clone(),
            });
            return;
        }
    }

    /// Split the catch-all along the next common-prefix boundary: entries
    /// sharing more prefix bits with the local key move into a fresh
    /// catch-all, the rest stay behind in a now-fixed bucket.
    fn split_catch_all(&mut self) {
        let boundary = self.buckets.len();
        let last = boundary - 1;
        let mut moved = VecDeque::new();
        let mut kept = VecDeque::new();
        while let Some(entry) = self.buckets[last].entries.pop_front() {
            if common_prefix_len(&self.local_key, &entry.key) >= boundary {
                moved.push_back(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.buckets[last].entries = kept;
        self.buckets.push(Bucket { entries: moved });
        debug!("split routing table at prefix length {boundary}");
    }

    /// Look up a stored peer by any identifier of `query` (id,
    /// `address:udpPort`, bare address).
    ///
    /// A query carrying identifying fields only matches an entry with the
    /// same identity; a bare-address query matches whatever peer is
    /// indexed at that address.
    pub fn get(&self, query: &PeerInfo) -> Option<PeerInfo> {
        self.lookup_id(query).and_then(|id| self.find_by_id(&id))
    }

    /// Resolve a query to the id of a stored entry consistent with it.
    fn lookup_id(&self, query: &PeerInfo) -> Option<PeerId> {
        let address_only = query.id.is_none() && query.udp_port.is_none();
        for index_key in query.keys() {
            if let Some(id) = self.index.get(&index_key).copied() {
                if let Some(peer) = self.find_by_id(&id) {
                    if address_only || peer.matches(query) {
                        return Some(id);
                    }
                }
            }
        }
        None
    }

    fn find_by_id(&self, id: &PeerId) -> Option<PeerInfo> {
        let idx = self.bucket_index(&bucket_key(id));
        self.buckets[idx]
            .entries
            .iter()
            .find(|entry| entry.peer.id.as_ref() == Some(id))
            .map(|entry| entry.peer.clone())
    }

    /// Remove the entry matching any identifier of `query`.
    pub fn remove(&mut self, query: &PeerInfo) {
        let Some(id) = self.lookup_id(query) else {
            return;
        };

        let idx = self.bucket_index(&bucket_key(&id));
        if let Some(pos) = self.buckets[idx]
            .entries
            .iter()
            .position(|entry| entry.peer.id == Some(id))
        {
            if let Some(entry) = self.buckets[idx].entries.remove(pos) {
                for index_key in entry.peer.keys() {
                    self.index.remove(&index_key);
                }
                debug!("removed peer {} from bucket {idx}", entry.peer);
                let _ = self.events.send(KBucketEvent::Removed(entry.peer));
            }
        }
    }

    /// Up to K peers sorted ascending by XOR distance to `target`.
    pub fn closest(&self, target: &PeerId) -> Vec<PeerInfo> {
        let target_key = bucket_key(target);
        let mut all: Vec<(B256, PeerInfo)> = self
            .buckets
            .iter()
            .flat_map(|bucket| bucket.entries.iter())
            .map(|entry| (xor_distance(&entry.key, &target_key), entry.peer.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all.truncate(BUCKET_SIZE);
        all.into_iter().map(|(_, peer)| peer).collect()
    }

    /// When the matching entry was last added or refreshed.
    pub fn last_seen(&self, query: &PeerInfo) -> Option<Instant> {
        let id = self.lookup_id(query)?;
        let idx = self.bucket_index(&bucket_key(&id));
        self.buckets[idx]
            .entries
            .iter()
            .find(|entry| entry.peer.id == Some(id))
            .map(|entry| entry.last_seen)
    }

    /// Enumerate all live entries.
    pub fn get_all(&self) -> Vec<PeerInfo> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.entries.iter())
            .map(|entry| entry.peer.clone())
            .collect()
    }

    /// Total number of stored peers.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
