use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, sleep};

use crate::core::keys;
use crate::network::banlist::BanList;
use crate::network::dns::DnsProvider;
use crate::network::events::{DptEvent, DptEventKind, EventBus};
use crate::network::kbucket::{KBucket, KBucketEvent};
use crate::network::peer::{PeerId, PeerInfo};
use crate::network::server::{DiscoveryServer, ServerEvent};
use crate::utils::{DptError, Result};

/// Delay between the starts of consecutive probes in one batch ingest, a
/// small admission-control shaper so a DNS or neighbours batch cannot
/// burst-saturate the UDP server.
const BATCH_SPACING: Duration = Duration::from_millis(200);

/// The refresh period is divided into this many selector slots, so every
/// peer is probed roughly once per full period.
const REFRESH_SLOTS: usize = 10;

/// Coordinator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DptOptions {
    /// Run `find_neighbours` probes during refresh and ingest the
    /// resulting `peers` events.
    pub should_find_neighbours: bool,
    /// Pull peers from signed DNS peer lists during refresh.
    pub should_get_dns_peers: bool,
    /// Requested peers per DNS refresh; halved at the resolver call.
    pub dns_refresh_quantity: usize,
    /// ENR tree domains to query.
    pub dns_networks: Vec<String>,
    /// Resolver endpoint handed to the DNS provider.
    pub dns_addr: String,
    /// Base refresh period, amortized across ten selector slots.
    pub refresh_interval_ms: u64,
    /// UDP ping timeout, forwarded to the server by the embedding layer.
    pub timeout_ms: Option<u64>,
    /// Advertised local endpoint, forwarded to the server likewise.
    pub endpoint: Option<PeerInfo>,
}

impl Default for DptOptions {
    fn default() -> Self {
        Self {
            should_find_neighbours: true,
            should_get_dns_peers: false,
            dns_refresh_quantity: 25,
            dns_networks: Vec::new(),
            dns_addr: "8.8.8.8".to_string(),
            refresh_interval_ms: 60_000,
            timeout_ms: None,
            endpoint: None,
        }
    }
}

/// The distributed peer table coordinator.
///
/// Owns the Kademlia routing table and the ban list, drives liveness
/// probes through a [`DiscoveryServer`] and optionally ingests peers from
/// a [`DnsProvider`]. All handles are cheap clones of shared state, so
/// the coordinator can be handed to background tasks freely.
#[derive(Clone)]
pub struct Dpt {
    id: PeerId,
    kbucket: Arc<RwLock<KBucket>>,
    banlist: Arc<RwLock<BanList>>,
    server: Arc<dyn DiscoveryServer>,
    dns: Option<Arc<dyn DnsProvider>>,
    options: DptOptions,
    events: EventBus,
    refresh_counter: Arc<AtomicUsize>,
    shutdown: broadcast::Sender<()>,
    destroyed: Arc<AtomicBool>,
}

impl Dpt {
    /// Create a coordinator from a 32-byte secp256k1 private key.
    ///
    /// The key is consumed for node-id derivation and not retained. The
    /// refresh loop and event forwarding start immediately, so this must
    /// be called from within a tokio runtime.
    pub fn new(
        private_key: &[u8],
        server: Arc<dyn DiscoveryServer>,
        dns: Option<Arc<dyn DnsProvider>>,
        options: DptOptions,
    ) -> Result<Self> {
        let id = keys::private_to_public(private_key)?;
        let (kbucket, kbucket_events) = KBucket::new(&id);
        let (shutdown, _) = broadcast::channel(1);

        let dpt = Self {
            id,
            kbucket: Arc::new(RwLock::new(kbucket)),
            banlist: Arc::new(RwLock::new(BanList::new())),
            server,
            dns,
            options,
            events: EventBus::new(),
            refresh_counter: Arc::new(AtomicUsize::new(0)),
            shutdown,
            destroyed: Arc::new(AtomicBool::new(false)),
        };

        info!("DPT initialized with node id {}...", &hex::encode(&dpt.id[..4]));

        dpt.spawn_kbucket_task(kbucket_events);
        dpt.spawn_server_task();
        dpt.spawn_refresh_loop();
        Ok(dpt)
    }

    /// The local 64-byte node id.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Register for every coordinator event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DptEvent> {
        self.events.subscribe()
    }

    /// Register for a single event kind.
    pub fn subscribe_kind(&self, kind: DptEventKind) -> mpsc::UnboundedReceiver<DptEvent> {
        self.events.subscribe_kind(kind)
    }

    /// Bind the discovery transport.
    pub async fn bind(&self, address: &str, port: u16) -> Result<()> {
        self.server.bind(address, port).await
    }

    /// Tear the coordinator down: stop the refresh loop, close the
    /// transport and emit `Close`. Idempotent; in-flight probes finish
    /// but no longer mutate the table.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(());
        self.server.close().await;
        self.events.emit(DptEvent::Close);
    }

    /// Probe a candidate and insert it on success.
    ///
    /// A banned candidate fails with [`DptError::Banned`]; a known one
    /// returns its stored entry without a probe. A failed probe bans the
    /// candidate for the default duration and propagates the error.
    pub async fn add_peer(&self, peer: &PeerInfo) -> Result<PeerInfo> {
        if self.banlist.write().await.has(peer) {
            return Err(DptError::Banned(peer.to_string()));
        }
        if let Some(existing) = self.kbucket.read().await.get(peer) {
            return Ok(existing);
        }

        match self.server.ping(peer).await {
            Ok(confirmed) => {
                if self.destroyed.load(Ordering::SeqCst) {
                    return Err(DptError::Transport("DPT destroyed".to_string()));
                }
                self.events.emit(DptEvent::PeerNew(confirmed.clone()));
                self.kbucket.write().await.add(&confirmed);
                Ok(confirmed)
            }
            Err(err) => {
                debug!("ping to {peer} failed: {err}");
                self.banlist.write().await.add(peer, None);
                Err(err)
            }
        }
    }

    /// Seed the table through a known peer: add it, then ask it for the
    /// neighbours of our own id. Errors are emitted on the error channel
    /// and swallowed.
    pub async fn bootstrap(&self, peer: &PeerInfo) {
        let peer = match self.add_peer(peer).await {
            Ok(peer) => peer,
            Err(err) => {
                self.events.emit(DptEvent::Error(err));
                return;
            }
        };
        if self.options.should_find_neighbours {
            self.server.find_neighbours(&peer, &self.id).await;
        }
    }

    /// Look up a stored peer by any identifier.
    pub async fn get_peer(&self, query: &PeerInfo) -> Option<PeerInfo> {
        self.kbucket.read().await.get(query)
    }

    /// All stored peers.
    pub async fn get_peers(&self) -> Vec<PeerInfo> {
        self.kbucket.read().await.get_all()
    }

    /// Up to K stored peers closest to `id` by XOR distance.
    pub async fn get_closest_peers(&self, id: &PeerId) -> Vec<PeerInfo> {
        self.kbucket.read().await.closest(id)
    }

    /// Drop a peer from the table.
    pub async fn remove_peer(&self, peer: &PeerInfo) {
        self.kbucket.write().await.remove(peer);
    }

    /// Ban a peer and drop it from the table.
    pub async fn ban_peer(&self, peer: &PeerInfo, max_age: Option<Duration>) {
        self.banlist.write().await.add(peer, max_age);
        self.kbucket.write().await.remove(peer);
    }

    /// Fetch a batch of verified peers from the DNS provider.
    pub async fn get_dns_peers(&self) -> Result<Vec<PeerInfo>> {
        let dns = self
            .dns
            .as_ref()
            .ok_or_else(|| DptError::Transport("no DNS provider configured".to_string()))?;
        dns.get_peers(
            self.options.dns_refresh_quantity / 2,
            &self.options.dns_networks,
        )
        .await
    }

    /// One refresh tick: probe the peers whose selector matches the
    /// rotating slot counter, and stage a DNS batch when enabled.
    pub async fn refresh(&self) {
        let slot = self
            .refresh_counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |counter| {
                Some((counter + 1) % REFRESH_SLOTS)
            })
            .unwrap_or(0);

        if self.options.should_find_neighbours {
            let peers = self.kbucket.read().await.get_all();
            debug!("refresh slot {slot}, {} peers in table", peers.len());
            for peer in peers {
                if let Some(id) = peer.id {
                    if id[0] as usize % REFRESH_SLOTS == slot {
                        let mut target_bytes = [0u8; 64];
                        rand::Rng::fill(&mut rand::thread_rng(), &mut target_bytes);
                        let target = PeerId::from(target_bytes);
                        self.server.find_neighbours(&peer, &target).await;
                    }
                }
            }
        }

        if self.options.should_get_dns_peers {
            match self.get_dns_peers().await {
                Ok(peers) => self.add_peer_batch(peers),
                Err(err) => debug!("DNS refresh failed: {err}"),
            }
        }
    }

    /// Stage a batch of candidates: probe starts are spaced 200 ms apart
    /// in received order, completions are independent, and each failure
    /// is emitted on the error channel without short-circuiting the rest.
    fn add_peer_batch(&self, peers: Vec<PeerInfo>) {
        for (i, peer) in peers.into_iter().enumerate() {
            let dpt = self.clone();
            tokio::spawn(async move {
                sleep(BATCH_SPACING * i as u32).await;
                if dpt.destroyed.load(Ordering::SeqCst) {
                    return;
                }
                if let Err(err) = dpt.add_peer(&peer).await {
                    dpt.events.emit(DptEvent::Error(err));
                }
            });
        }
    }

    /// Resolve a k-bucket `Ping` contract.
    ///
    /// All old candidates are probed concurrently and every failure is
    /// banned and evicted. Only after the whole round completes is the
    /// newcomer admitted (if anything failed) or banned (if the bucket
    /// defended itself), per Kademlia's prefer-old-peers policy.
    async fn resolve_ping(&self, old_peers: Vec<PeerInfo>, new_peer: PeerInfo) {
        if self.banlist.write().await.has(&new_peer) {
            return;
        }

        let mut probes = Vec::with_capacity(old_peers.len());
        for old in old_peers {
            let server = self.server.clone();
            probes.push(tokio::spawn(async move {
                let outcome = server.ping(&old).await;
                (old, outcome)
            }));
        }

        let mut first_err: Option<DptError> = None;
        let mut any_failed = false;
        for probe in probes {
            let Ok((old, outcome)) = probe.await else {
                continue;
            };
            if let Err(err) = outcome {
                if first_err.is_none() {
                    first_err = Some(err);
                }
                any_failed = true;
                if self.destroyed.load(Ordering::SeqCst) {
                    continue;
                }
                self.banlist.write().await.add(&old, None);
                self.kbucket.write().await.remove(&old);
            }
        }

        if self.destroyed.load(Ordering::SeqCst) {
            return;
        }
        if any_failed {
            self.kbucket.write().await.add(&new_peer);
        } else {
            self.banlist.write().await.add(&new_peer, None);
        }
        if let Some(err) = first_err {
            debug!("first failed eviction probe: {err}");
        }
    }

    fn spawn_kbucket_task(&self, mut events: mpsc::UnboundedReceiver<KBucketEvent>) {
        let dpt = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        match event {
                            KBucketEvent::Added(peer) => dpt.events.emit(DptEvent::PeerAdded(peer)),
                            KBucketEvent::Removed(peer) => {
                                dpt.events.emit(DptEvent::PeerRemoved(peer))
                            }
                            KBucketEvent::Ping { old_peers, new_peer } => {
                                let dpt = dpt.clone();
                                tokio::spawn(async move {
                                    dpt.resolve_ping(old_peers, new_peer).await;
                                });
                            }
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    fn spawn_server_task(&self) {
        let dpt = self.clone();
        let mut events = self.server.subscribe();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        match event {
                            ServerEvent::Listening => dpt.events.emit(DptEvent::Listening),
                            ServerEvent::Close => {
                                if !dpt.destroyed.load(Ordering::SeqCst) {
                                    dpt.events.emit(DptEvent::Close);
                                }
                            }
                            ServerEvent::Error(err) => {
                                warn!("discovery server error: {err}");
                                dpt.events.emit(DptEvent::Error(err));
                            }
                            ServerEvent::Peers(peers) => {
                                // Without our own neighbour probes running,
                                // these batches would mostly duplicate work
                                if dpt.options.should_find_neighbours
                                    && !dpt.destroyed.load(Ordering::SeqCst)
                                {
                                    dpt.add_peer_batch(peers);
                                }
                            }
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    fn spawn_refresh_loop(&self) {
        let dpt = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        let period = Duration::from_millis((self.options.refresh_interval_ms / 10).max(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick fires immediately; the loop should wait a
            // full slot before the first refresh
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => dpt.refresh().await,
                    _ = shutdown.recv() => break,
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use tokio::time::timeout;

    const PRIVATE_KEY: [u8; 32] = [
        0xb7, 0x1c, 0x71, 0xa6, 0x7e, 0x11, 0x77, 0xad, 0x4e, 0x90, 0x16, 0x95, 0xe1, 0xb4, 0xb9,
        0xee, 0x17, 0xae, 0x16, 0xc6, 0x66, 0x8d, 0x31, 0x3e, 0xac, 0x2f, 0x96, 0xdb, 0xcd, 0xa3,
        0xf2, 0x91,
    ];

    #[derive(Default)]
    struct MockServer {
        subscribers: Mutex<Vec<mpsc::UnboundedSender<ServerEvent>>>,
        pings: Mutex<Vec<PeerInfo>>,
        neighbour_calls: Mutex<Vec<(PeerInfo, PeerId)>>,
        failing: Mutex<HashSet<String>>,
    }

    impl MockServer {
        fn fail_for(&self, peer: &PeerInfo) {
            self.failing.lock().unwrap().extend(peer.keys());
        }

        fn pinged(&self) -> Vec<PeerInfo> {
            self.pings.lock().unwrap().clone()
        }

        fn neighbours(&self) -> Vec<(PeerInfo, PeerId)> {
            self.neighbour_calls.lock().unwrap().clone()
        }

        fn push(&self, event: ServerEvent) {
            for sender in self.subscribers.lock().unwrap().iter() {
                let _ = sender.send(event.clone());
            }
        }
    }

    #[async_trait]
    impl DiscoveryServer for MockServer {
        async fn bind(&self, _address: &str, _port: u16) -> Result<()> {
            self.push(ServerEvent::Listening);
            Ok(())
        }

        async fn ping(&self, peer: &PeerInfo) -> Result<PeerInfo> {
            self.pings.lock().unwrap().push(peer.clone());
            let failing = self.failing.lock().unwrap();
            if peer.keys().iter().any(|key| failing.contains(key)) {
                return Err(DptError::PingFailed(peer.to_string()));
            }
            let mut confirmed = peer.clone();
            if confirmed.id.is_none() {
                let mut id_bytes = [0u8; 64];
                rand::Rng::fill(&mut rand::thread_rng(), &mut id_bytes);
                confirmed.id = Some(PeerId::from(id_bytes));
            }
            Ok(confirmed)
        }

        async fn find_neighbours(&self, peer: &PeerInfo, target: &PeerId) {
            self.neighbour_calls
                .lock()
                .unwrap()
                .push((peer.clone(), *target));
        }

        async fn close(&self) {
            self.push(ServerEvent::Close);
        }

        fn subscribe(&self) -> mpsc::UnboundedReceiver<ServerEvent> {
            let (sender, receiver) = mpsc::unbounded_channel();
            self.subscribers.lock().unwrap().push(sender);
            receiver
        }
    }

    fn test_dpt(options: DptOptions) -> (Dpt, Arc<MockServer>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let server = Arc::new(MockServer::default());
        let dpt = Dpt::new(&PRIVATE_KEY, server.clone(), None, options).unwrap();
        (dpt, server)
    }

    fn peer(seed: u8, port: u16) -> PeerInfo {
        PeerInfo::from_endpoint("10.0.0.1", port).with_id(PeerId::from([seed; 64]))
    }

    #[tokio::test]
    async fn test_add_peer_inserts_and_emits() {
        let (dpt, server) = test_dpt(DptOptions::default());
        let mut new_events = dpt.subscribe_kind(DptEventKind::PeerNew);

        let candidate = peer(1, 30303);
        let confirmed = dpt.add_peer(&candidate).await.unwrap();
        assert_eq!(confirmed, candidate);
        assert_eq!(server.pinged().len(), 1);
        assert_eq!(dpt.get_peer(&candidate).await, Some(candidate.clone()));

        let event = timeout(Duration::from_secs(1), new_events.recv())
            .await
            .unwrap();
        assert!(matches!(event, Some(DptEvent::PeerNew(p)) if p == candidate));

        // A second add short-circuits on the stored entry
        dpt.add_peer(&candidate).await.unwrap();
        assert_eq!(server.pinged().len(), 1);
    }

    #[tokio::test]
    async fn test_add_peer_banned() {
        let (dpt, server) = test_dpt(DptOptions::default());

        let candidate = peer(2, 30303);
        dpt.ban_peer(&candidate, None).await;

        let err = dpt.add_peer(&candidate).await.unwrap_err();
        assert!(matches!(err, DptError::Banned(_)));
        assert_eq!(dpt.get_peer(&candidate).await, None);
        assert!(server.pinged().is_empty());
    }

    #[tokio::test]
    async fn test_failed_ping_bans_candidate() {
        let (dpt, server) = test_dpt(DptOptions::default());

        let candidate = peer(3, 30303);
        server.fail_for(&candidate);

        let err = dpt.add_peer(&candidate).await.unwrap_err();
        assert!(matches!(err, DptError::PingFailed(_)));
        assert_eq!(dpt.get_peer(&candidate).await, None);

        // Now covered by the ban list, no second probe happens
        let err = dpt.add_peer(&candidate).await.unwrap_err();
        assert!(matches!(err, DptError::Banned(_)));
        assert_eq!(server.pinged().len(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_probes_own_neighbourhood() {
        let (dpt, server) = test_dpt(DptOptions::default());

        let entry = peer(4, 30303);
        dpt.bootstrap(&entry).await;

        assert_eq!(dpt.get_peer(&entry).await, Some(entry.clone()));
        let calls = server.neighbours();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, entry);
        assert_eq!(calls[0].1, dpt.id());
    }

    #[tokio::test]
    async fn test_bootstrap_swallows_errors_onto_channel() {
        let (dpt, server) = test_dpt(DptOptions::default());
        let mut errors = dpt.subscribe_kind(DptEventKind::Error);

        let entry = peer(5, 30303);
        server.fail_for(&entry);
        dpt.bootstrap(&entry).await;

        let event = timeout(Duration::from_secs(1), errors.recv()).await.unwrap();
        assert!(matches!(event, Some(DptEvent::Error(DptError::PingFailed(_)))));
        assert!(server.neighbours().is_empty());
    }

    #[tokio::test]
    async fn test_eviction_keeps_defended_bucket() {
        let (dpt, _server) = test_dpt(DptOptions::default());

        let old_peers: Vec<PeerInfo> = (10..13).map(|i| peer(i, 30300 + i as u16)).collect();
        for p in &old_peers {
            dpt.kbucket.write().await.add(p);
        }
        let newcomer = peer(42, 30400);

        dpt.resolve_ping(old_peers.clone(), newcomer.clone()).await;

        // Everyone answered: the old entries stay, the newcomer is banned
        for p in &old_peers {
            assert_eq!(dpt.get_peer(p).await, Some(p.clone()));
        }
        assert_eq!(dpt.get_peer(&newcomer).await, None);
        assert!(dpt.banlist.write().await.has(&newcomer));
        let err = dpt.add_peer(&newcomer).await.unwrap_err();
        assert!(matches!(err, DptError::Banned(_)));
    }

    #[tokio::test]
    async fn test_eviction_replaces_stale_peers() {
        let (dpt, server) = test_dpt(DptOptions::default());

        let old_peers: Vec<PeerInfo> = (20..24).map(|i| peer(i, 30300 + i as u16)).collect();
        for p in &old_peers {
            dpt.kbucket.write().await.add(p);
        }
        // Two of the four have gone quiet
        server.fail_for(&old_peers[1]);
        server.fail_for(&old_peers[3]);
        let newcomer = peer(43, 30400);

        dpt.resolve_ping(old_peers.clone(), newcomer.clone()).await;

        assert_eq!(dpt.get_peer(&old_peers[0]).await, Some(old_peers[0].clone()));
        assert_eq!(dpt.get_peer(&old_peers[2]).await, Some(old_peers[2].clone()));
        assert_eq!(dpt.get_peer(&old_peers[1]).await, None);
        assert_eq!(dpt.get_peer(&old_peers[3]).await, None);
        assert!(dpt.banlist.write().await.has(&old_peers[1]));
        // The newcomer took one of the freed slots
        assert_eq!(dpt.get_peer(&newcomer).await, Some(newcomer.clone()));
    }

    #[tokio::test]
    async fn test_banned_newcomer_skips_eviction_round() {
        let (dpt, server) = test_dpt(DptOptions::default());

        let old_peers = vec![peer(30, 30330)];
        dpt.kbucket.write().await.add(&old_peers[0]);
        let newcomer = peer(44, 30400);
        dpt.ban_peer(&newcomer, None).await;

        dpt.resolve_ping(old_peers, newcomer).await;
        assert!(server.pinged().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_probes_matching_slot_only() {
        let (dpt, server) = test_dpt(DptOptions::default());

        // id[0] = 10 selects slot 0, id[0] = 13 selects slot 3
        let in_slot = peer(10, 30310);
        let out_of_slot = peer(13, 30313);
        dpt.kbucket.write().await.add(&in_slot);
        dpt.kbucket.write().await.add(&out_of_slot);

        dpt.refresh().await;

        let calls = server.neighbours();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, in_slot);
        // Targets are randomized per probe, not our own id
        assert_ne!(calls[0].1, dpt.id());
    }

    #[tokio::test]
    async fn test_peers_event_is_staged_into_table() {
        let (dpt, server) = test_dpt(DptOptions::default());

        let batch = vec![peer(50, 30350), peer(51, 30351)];
        server.push(ServerEvent::Peers(batch.clone()));

        // 200 ms spacing: both probes have started well within a second
        sleep(Duration::from_millis(600)).await;
        assert_eq!(dpt.get_peer(&batch[0]).await, Some(batch[0].clone()));
        assert_eq!(dpt.get_peer(&batch[1]).await, Some(batch[1].clone()));
    }

    #[tokio::test]
    async fn test_peers_event_ignored_without_neighbour_probes() {
        let options = DptOptions {
            should_find_neighbours: false,
            ..Default::default()
        };
        let (dpt, server) = test_dpt(options);

        server.push(ServerEvent::Peers(vec![peer(52, 30352)]));
        sleep(Duration::from_millis(300)).await;
        assert!(dpt.get_peers().await.is_empty());
        assert!(server.pinged().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_final() {
        let (dpt, server) = test_dpt(DptOptions::default());
        let mut closes = dpt.subscribe_kind(DptEventKind::Close);

        dpt.destroy().await;
        dpt.destroy().await;

        let event = timeout(Duration::from_secs(1), closes.recv()).await.unwrap();
        assert!(matches!(event, Some(DptEvent::Close)));
        // Only the one Close emitted despite the server's own close event
        assert!(closes.try_recv().is_err());

        let err = dpt.add_peer(&peer(60, 30360)).await.unwrap_err();
        assert!(matches!(err, DptError::Transport(_)));
        assert!(dpt.get_peers().await.is_empty());
        let _ = server;
    }

    #[tokio::test]
    async fn test_get_dns_peers_requires_provider() {
        let (dpt, _server) = test_dpt(DptOptions::default());
        let err = dpt.get_dns_peers().await.unwrap_err();
        assert!(matches!(err, DptError::Transport(_)));
    }
}
