//! Per-peer state (§3): everything one connection owns between the moment
//! it's created and the moment it's freed, plus the dispatcher hooks the
//! owner (peer manager) is called back on.
//!
//! Resource ownership is exclusive to a single [`Peer`]; the only thing
//! shared across threads without the coarse lock below is a handful of
//! fields another thread legitimately races to set — those live in
//! [`Timing`] as atomics, matching the module's own design note in favor of
//! one mutex over ad hoc volatile flags.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::ErrorCode;

/// Upper bound on remembered block hashes (I2). Exceeding it discards the
/// oldest third, rather than evicting one at a time, to avoid doing this
/// work on every single `inv`.
pub const MAX_KNOWN_BLOCK_HASHES: usize = 50_000;

/// A connection's lifecycle stage (I1: `Connected` iff both verack flags are set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Connecting,
    Connected,
}

/// One-way, monotonic-within-a-session handshake progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandshakeFlags {
    pub sent_version: bool,
    pub sent_verack: bool,
    pub got_verack: bool,
}

impl HandshakeFlags {
    fn status(&self) -> Status {
        if self.sent_verack && self.got_verack {
            Status::Connected
        } else {
            Status::Connecting
        }
    }
}

/// Which outstanding requests have been sent this session. Cleared on
/// disconnect so a reconnect starts from a clean slate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestFlags {
    pub sent_filter: bool,
    pub sent_getaddr: bool,
    pub sent_getdata: bool,
    pub sent_getblocks: bool,
}

/// Timing fields another thread may set concurrently with the reader loop
/// observing them; each is an independent atomic rather than a lock, since
/// there's no invariant across more than one of them at a time.
#[derive(Debug)]
pub struct Timing {
    /// Wall-clock time (unix seconds) this peer was created.
    pub start_time: AtomicU64,
    /// Smoothed round-trip time in milliseconds (EMA, factor 0.5).
    pub ping_time_ms: AtomicU64,
    /// Unix time the reader should time out and disconnect. `u64::MAX` disables it.
    pub disconnect_time: AtomicU64,
    /// Unix time the next `mempool` ping-chain check should fire. `u64::MAX` disables it.
    pub mempool_time: AtomicU64,
    /// Whether the owner has asked for a fresh bloom filter to be loaded.
    pub needs_filter_update: AtomicBool,
    /// Best known height, set by the owner as the chain advances locally.
    pub current_block_height: AtomicU32,
    /// Whether a `mempool` request has been sent this session.
    pub sent_mempool: AtomicBool,
    /// The wallet's earliest key time, used by the locator engine to decide
    /// how far back header/block catch-up needs to go.
    pub earliest_key_time: AtomicU32,
}

/// Sentinel value for a disabled deadline (§3: "disconnectTime ... ∞ = disabled").
pub const DEADLINE_DISABLED: u64 = u64::MAX;

impl Default for Timing {
    fn default() -> Self {
        Self {
            start_time: AtomicU64::new(0),
            ping_time_ms: AtomicU64::new(0),
            disconnect_time: AtomicU64::new(DEADLINE_DISABLED),
            mempool_time: AtomicU64::new(DEADLINE_DISABLED),
            needs_filter_update: AtomicBool::new(false),
            current_block_height: AtomicU32::new(0),
            sent_mempool: AtomicBool::new(false),
            earliest_key_time: AtomicU32::new(0),
        }
    }
}

/// An ordered set of hashes: insertion order is preserved for FIFO eviction,
/// membership is checked in O(1). Used for both known-tx and known-block
/// memory.
#[derive(Debug, Default, Clone)]
pub struct HashMemory {
    order: VecDeque<[u8; 32]>,
    set: HashSet<[u8; 32]>,
}

impl HashMemory {
    pub fn contains(&self, hash: &[u8; 32]) -> bool {
        self.set.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate remembered hashes in insertion (oldest-first) order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8; 32]> {
        self.order.iter()
    }

    /// Remember a hash, ignoring duplicates.
    pub fn insert(&mut self, hash: [u8; 32]) {
        if self.set.insert(hash) {
            self.order.push_back(hash);
        }
    }

    /// Remember a hash, discarding the oldest third once `cap` is exceeded (I2).
    pub fn insert_capped(&mut self, hash: [u8; 32], cap: usize) {
        self.insert(hash);
        if self.order.len() > cap {
            let to_drop = self.order.len() / 3;
            for _ in 0..to_drop {
                if let Some(old) = self.order.pop_front() {
                    self.set.remove(&old);
                }
            }
        }
    }
}

/// State of a `merkleblock` whose matched transactions haven't all arrived
/// yet. Modeled as a substate rather than a nullable field (I3), per the
/// module's design note.
#[derive(Debug, Clone, Default)]
pub enum CurrentBlock {
    #[default]
    Idle,
    /// A merkleblock was received with unresolved matched-tx hashes; they're
    /// kept in reverse order so the common case (arriving in broadcast
    /// order) pops from the tail cheaply.
    AwaitingTx {
        header: Vec<u8>,
        pending_tx_hashes: Vec<[u8; 32]>,
    },
}

/// A callback invoked exactly once, either on success or on failure (e.g.
/// disconnect before it could complete).
pub type Callback<T> = Box<dyn FnOnce(Result<T, ErrorCode>) + Send>;

/// Information describing an in-flight `mempool` request (I5).
#[derive(Debug, Default, Clone)]
pub struct MempoolInfo {
    pub known_tx_hashes: Vec<[u8; 32]>,
}

/// Outstanding, exactly-once callback registries (§3, §9's "outstanding
/// requests" design note): one FIFO per in-flight ping, at most one
/// in-flight mempool request, at most one in-flight asset-data request.
#[derive(Default)]
pub struct Outstanding {
    pub pongs: VecDeque<Callback<()>>,
    pub mempool: Option<(MempoolInfo, Callback<()>)>,
    pub asset: Option<(String, Callback<Option<crate::message::asset::AssetData>>)>,
}

impl fmt::Debug for Outstanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Outstanding")
            .field("pongs", &self.pongs.len())
            .field("mempool_armed", &self.mempool.is_some())
            .field("asset_armed", &self.asset.is_some())
            .finish()
    }
}

impl Outstanding {
    /// Fail every outstanding callback, draining them in enqueue order (O3).
    /// Called once, when the reader observes the connection has died.
    pub fn fail_all(&mut self) {
        while let Some(cb) = self.pongs.pop_front() {
            cb(Err(ErrorCode::ConnReset));
        }
        if let Some((_, cb)) = self.mempool.take() {
            cb(Err(ErrorCode::ConnReset));
        }
        if let Some((_, cb)) = self.asset.take() {
            cb(Err(ErrorCode::ConnReset));
        }
    }
}

/// Dispatcher hooks: one-way notifications from this peer up to its owner
/// (the peer manager), mirroring the reference implementation's callback
/// table. Each defaults to a no-op so a caller need only override what it
/// cares about.
#[derive(Clone)]
pub struct Hooks {
    pub connected: Arc<dyn Fn() + Send + Sync>,
    pub disconnected: Arc<dyn Fn(ErrorCode) + Send + Sync>,
    pub relayed_peers: Arc<dyn Fn(&[crate::message::address::NetAddress]) + Send + Sync>,
    pub relayed_tx: Arc<dyn Fn(&[u8]) + Send + Sync>,
    pub has_tx: Arc<dyn Fn([u8; 32]) -> bool + Send + Sync>,
    pub rejected_tx: Arc<dyn Fn([u8; 32], u8) + Send + Sync>,
    pub relayed_block: Arc<dyn Fn(&[u8], &[[u8; 32]]) + Send + Sync>,
    pub notfound: Arc<dyn Fn(&[crate::message::inventory::InventoryItem]) + Send + Sync>,
    pub set_fee_per_kb: Arc<dyn Fn(u64) + Send + Sync>,
    pub requested_tx: Arc<dyn Fn([u8; 32]) -> Option<Vec<u8>> + Send + Sync>,
    pub network_is_reachable: Arc<dyn Fn() -> bool + Send + Sync>,
    pub thread_cleanup: Arc<dyn Fn() + Send + Sync>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            connected: Arc::new(|| {}),
            disconnected: Arc::new(|_| {}),
            relayed_peers: Arc::new(|_| {}),
            relayed_tx: Arc::new(|_| {}),
            has_tx: Arc::new(|_| false),
            rejected_tx: Arc::new(|_, _| {}),
            relayed_block: Arc::new(|_, _| {}),
            notfound: Arc::new(|_| {}),
            set_fee_per_kb: Arc::new(|_| {}),
            requested_tx: Arc::new(|_| None),
            network_is_reachable: Arc::new(|| true),
            thread_cleanup: Arc::new(|| {}),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish()
    }
}

/// Everything guarded by the single coarse mutex: handshake/request flags,
/// negotiated fields, known-hash memory, the in-progress block, and the
/// outstanding-callback registries.
#[derive(Debug, Default)]
pub struct Locked {
    pub handshake: HandshakeFlags,
    pub requests: RequestFlags,
    pub remote_version: u32,
    pub user_agent: String,
    pub last_block: u32,
    pub fee_per_kb: u64,
    pub known_tx_hashes: HashMemory,
    pub known_block_hashes: HashMemory,
    pub last_block_hash: Option<[u8; 32]>,
    pub current_block: CurrentBlock,
    pub outstanding: Outstanding,
}

/// A single peer connection's full state (§3).
#[derive(Debug)]
pub struct Peer {
    pub addr: [u8; 16],
    pub port: u16,
    pub services: u64,
    pub timestamp: u64,
    pub local_nonce: u64,
    pub timing: Timing,
    locked: Mutex<Locked>,
    hooks: Hooks,
}

impl Peer {
    /// Construct a freshly created, `Disconnected` peer (§3 lifecycle).
    pub fn new(addr: [u8; 16], port: u16, services: u64, timestamp: u64, local_nonce: u64) -> Self {
        Self {
            addr,
            port,
            services,
            timestamp,
            local_nonce,
            timing: Timing::default(),
            locked: Mutex::new(Locked::default()),
            hooks: Hooks::default(),
        }
    }

    /// Replace the dispatcher hooks (`SetCallbacks`).
    pub fn set_hooks(&mut self, hooks: Hooks) {
        self.hooks = hooks;
    }

    /// Current handshake-derived status (I1).
    pub fn status(&self) -> Status {
        let locked = self.locked.lock().unwrap();
        if !locked.handshake.sent_verack && !locked.handshake.got_verack && !locked.handshake.sent_version
        {
            Status::Disconnected
        } else {
            locked.handshake.status()
        }
    }

    /// Run a closure against the coarse-locked mutable state.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut Locked) -> R) -> R {
        let mut locked = self.locked.lock().unwrap();
        f(&mut locked)
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Fetch (and clear) both request flags and the known-hash memory, then
    /// invoke the `disconnected` hook. Called exactly once, by the reader
    /// thread, when the connection terminates (§3 lifecycle, §5 O3).
    pub fn finish_with_error(&self, code: ErrorCode) {
        self.with_locked(|locked| {
            locked.requests = RequestFlags::default();
            locked.outstanding.fail_all();
        });
        (self.hooks.disconnected)(code);
    }

    /// Record a new outstanding ping callback (I4).
    pub fn push_pong_callback(&self, cb: Callback<()>) {
        self.with_locked(|locked| locked.outstanding.pongs.push_back(cb));
    }

    /// Pop the oldest outstanding ping callback, invoking it with the RTT
    /// outcome. Returns `false` if none was outstanding (unexpected pong).
    pub fn pop_pong_callback(&self) -> Option<Callback<()>> {
        self.with_locked(|locked| locked.outstanding.pongs.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_peer() -> Peer {
        Peer::new(crate::constants::LOCAL_HOST, 8767, 1, 0, 42)
    }

    #[test]
    fn fresh_peer_is_disconnected() {
        assert_eq!(sample_peer().status(), Status::Disconnected);
    }

    #[test]
    fn connected_iff_both_verack_flags_set() {
        let peer = sample_peer();
        peer.with_locked(|l| l.handshake.sent_version = true);
        assert_eq!(peer.status(), Status::Connecting);
        peer.with_locked(|l| l.handshake.sent_verack = true);
        assert_eq!(peer.status(), Status::Connecting);
        peer.with_locked(|l| l.handshake.got_verack = true);
        assert_eq!(peer.status(), Status::Connected);
    }

    #[test]
    fn known_block_hashes_cap_discards_oldest_third() {
        let mut mem = HashMemory::default();
        for i in 0..60_000u32 {
            let mut h = [0u8; 32];
            h[..4].copy_from_slice(&i.to_le_bytes());
            mem.insert_capped(h, MAX_KNOWN_BLOCK_HASHES);
        }
        assert!(mem.len() <= MAX_KNOWN_BLOCK_HASHES);
        let mut first = [0u8; 32];
        first[..4].copy_from_slice(&0u32.to_le_bytes());
        assert!(!mem.contains(&first), "oldest entries must have been evicted");
    }

    #[test]
    fn disconnect_fails_outstanding_callbacks_exactly_once_in_order() {
        let peer = sample_peer();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            peer.push_pong_callback(Box::new(move |res| {
                assert!(res.is_err());
                order.lock().unwrap().push(i);
            }));
        }
        peer.finish_with_error(ErrorCode::ConnReset);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }
}
