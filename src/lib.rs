//! Ravencoin SPV peer connection: wire codec, handshake, and chain-sync
//! state machine for a single peer (§1).
//!
//! This crate owns exactly one TCP connection's lifecycle: framing,
//! message parsing/building, handshake and request bookkeeping, and the
//! header-chain locator engine that keeps a wallet's view of the chain
//! advancing. It does not select which peers to connect to, store a wallet,
//! parse transactions/blocks/bloom filters, or resolve DNS seeds — those
//! are the owning peer manager's job, reached only through the [`Hooks`]
//! callbacks and the `Send*` methods on [`PeerHandle`].
#![warn(missing_docs)]

pub mod codec;
pub mod constants;
pub mod error;
pub mod external;
pub mod locator;
pub mod message;
pub mod network;
pub mod peer_state;
pub mod pow;
pub mod runtime;
pub mod varint;

use std::io;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use error::{ErrorCode, PeerError};
pub use external::MessageParser;
pub use network::Network;
pub use peer_state::{Callback, Hooks, MempoolInfo, Peer, Status};
pub use pow::{HeaderHasher, ProofOfWork};
pub use runtime::Algorithms;

use message::inventory::InventoryItem;
use message::{commands, LocatorRequest};
use peer_state::DEADLINE_DISABLED;

/// A handle to a single peer connection, exposing the core API the peer
/// manager drives (§6). Construction (`New`) is cheap and doesn't touch the
/// network; [`PeerHandle::connect`] does.
pub struct PeerHandle {
    peer: Arc<Peer>,
    connection: Option<runtime::Connection>,
}

impl PeerHandle {
    /// Create a new, `Disconnected` peer for the given network address.
    pub fn new(addr: [u8; 16], port: u16, services: u64, timestamp: u64) -> Self {
        let local_nonce = fastrand::u64(..);
        Self { peer: Arc::new(Peer::new(addr, port, services, timestamp, local_nonce)), connection: None }
    }

    /// Install the dispatcher hooks this peer will call back into.
    pub fn set_callbacks(&mut self, hooks: Hooks) {
        Arc::get_mut(&mut self.peer)
            .expect("set_callbacks must run before connect, while the peer is uniquely owned")
            .set_hooks(hooks);
    }

    /// Set the wallet's earliest key time, anchoring how far back the
    /// header-chain locator engine needs to catch up.
    pub fn set_earliest_key_time(&self, time: u32) {
        self.peer.timing.earliest_key_time.store(time, Ordering::Release);
    }

    /// Set the best known local chain height, included in outbound
    /// `version` messages and consulted by the `inv` non-standard check.
    pub fn set_current_block_height(&self, height: u32) {
        self.peer.timing.current_block_height.store(height, Ordering::Release);
    }

    /// Ask for a fresh bloom filter to be loaded before further block
    /// fetches resume.
    pub fn set_needs_filter_update(&self, needs_update: bool) {
        self.peer.timing.needs_filter_update.store(needs_update, Ordering::Release);
    }

    /// Open the TCP connection, perform the handshake, and start the
    /// reader thread. May be called again after a `Disconnect` (§3
    /// lifecycle: `Connect` is repeatable).
    pub fn connect(
        &mut self,
        network: Network,
        local_addr: [u8; 16],
        local_port: u16,
        algorithms: Algorithms,
    ) -> io::Result<()> {
        let connection = runtime::connect(self.peer.clone(), network, local_addr, local_port, algorithms)?;
        self.connection = Some(connection);
        Ok(())
    }

    /// Close the socket. The reader thread observes this on its next
    /// read/write and tears the connection down (§5: the only disconnect
    /// primitive).
    pub fn disconnect(&self) {
        if let Some(conn) = &self.connection {
            conn.sender.shutdown();
        }
    }

    /// Cooperatively schedule a disconnect `seconds` from now, or disable
    /// the deadline entirely if `seconds` is negative.
    pub fn schedule_disconnect(&self, seconds: i64) {
        let at = if seconds < 0 {
            DEADLINE_DISABLED
        } else {
            now_unix() + seconds as u64
        };
        self.peer.timing.disconnect_time.store(at, Ordering::Release);
    }

    /// This peer's address.
    pub fn host(&self) -> ([u8; 16], u16) {
        (self.peer.addr, self.peer.port)
    }

    /// Current connection status (§3 I1).
    pub fn status(&self) -> Status {
        self.peer.status()
    }

    /// The remote peer's negotiated protocol version.
    pub fn version(&self) -> u32 {
        self.peer.with_locked(|l| l.remote_version)
    }

    /// The remote peer's user agent string.
    pub fn user_agent(&self) -> String {
        self.peer.with_locked(|l| l.user_agent.clone())
    }

    /// The remote peer's last announced block height.
    pub fn last_block(&self) -> u32 {
        self.peer.with_locked(|l| l.last_block)
    }

    /// Smoothed round-trip ping time, in milliseconds.
    pub fn ping_time_ms(&self) -> u64 {
        self.peer.timing.ping_time_ms.load(Ordering::Acquire)
    }

    /// The remote peer's minimum relay fee per kilobyte, if it has sent one.
    pub fn fee_per_kb(&self) -> u64 {
        self.peer.with_locked(|l| l.fee_per_kb)
    }

    fn sender(&self) -> io::Result<&runtime::Sender> {
        self.connection
            .as_ref()
            .map(|c| c.sender.as_ref())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "peer is not connected"))
    }

    /// Send an already-encoded message payload under the given command.
    pub fn send_message(&self, command: &str, payload: &[u8]) -> io::Result<()> {
        self.sender()?.send(command, payload)
    }

    /// Send a `filterload` message (raw BIP37 filter bytes; bloom-filter
    /// construction itself is out of scope).
    pub fn send_filterload(&self, filter: &[u8]) -> io::Result<()> {
        self.peer.with_locked(|l| l.requests.sent_filter = true);
        self.sender()?.send(commands::FILTERLOAD, filter)
    }

    /// Request the peer's mempool, invoking `callback` exactly once: on
    /// success once the chained ping round-trips, or on failure if the
    /// connection drops first (§3 I5).
    pub fn send_mempool(&self, known_tx_hashes: Vec<[u8; 32]>, callback: Callback<()>) -> io::Result<()> {
        self.peer.with_locked(|l| {
            l.outstanding.mempool = Some((MempoolInfo { known_tx_hashes }, callback));
        });
        self.peer.timing.sent_mempool.store(true, Ordering::Release);
        self.sender()?.send(commands::MEMPOOL, &[])
    }

    /// Request headers starting from `locators`, stopping at `hash_stop`
    /// (all zero for "as many as the peer has").
    pub fn send_getheaders(&self, locators: message::Locators, hash_stop: [u8; 32]) -> io::Result<()> {
        let req = LocatorRequest { version: constants::PROTOCOL_VERSION, locators, hash_stop };
        self.sender()?.send(commands::GETHEADERS, &req.encode())
    }

    /// Request full blocks starting from `locators`, stopping at `hash_stop`.
    pub fn send_getblocks(&self, locators: message::Locators, hash_stop: [u8; 32]) -> io::Result<()> {
        self.peer.with_locked(|l| l.requests.sent_getblocks = true);
        let req = LocatorRequest { version: constants::PROTOCOL_VERSION, locators, hash_stop };
        self.sender()?.send(commands::GETBLOCKS, &req.encode())
    }

    /// Announce transaction hashes via `inv`.
    pub fn send_inv(&self, tx_hashes: &[[u8; 32]]) -> io::Result<()> {
        let items: Vec<InventoryItem> = tx_hashes.iter().map(|h| InventoryItem::tx(*h)).collect();
        let mut out = Vec::new();
        message::inventory::write_inventory(&items, &mut out);
        self.sender()?.send(commands::INV, &out)
    }

    /// Request transactions and/or filtered blocks via `getdata`.
    pub fn send_getdata(&self, tx_hashes: &[[u8; 32]], block_hashes: &[[u8; 32]]) -> io::Result<()> {
        self.peer.with_locked(|l| l.requests.sent_getdata = true);
        let mut items: Vec<InventoryItem> = tx_hashes.iter().map(|h| InventoryItem::tx(*h)).collect();
        items.extend(block_hashes.iter().map(|h| InventoryItem::filtered_block(*h)));
        let mut out = Vec::new();
        message::inventory::write_inventory(&items, &mut out);
        self.sender()?.send(commands::GETDATA, &out)
    }

    /// Request a Ravencoin asset's metadata, invoking `callback` exactly
    /// once with `Ok(None)` if the peer reports `_NF`/`asstnotfound`.
    pub fn send_get_asset(
        &self,
        name: String,
        callback: Callback<Option<message::asset::AssetData>>,
    ) -> io::Result<()> {
        let payload = message::asset::encode_getassetdata(&name);
        self.peer.with_locked(|l| l.outstanding.asset = Some((name, callback)));
        self.sender()?.send(commands::GETASSETDATA, &payload)
    }

    /// Request the peer's known addresses.
    pub fn send_getaddr(&self) -> io::Result<()> {
        self.peer.with_locked(|l| l.requests.sent_getaddr = true);
        self.sender()?.send(commands::GETADDR, &[])
    }

    /// Send a `ping`, invoking `callback` exactly once: on success when its
    /// `pong` arrives, or on failure if the connection drops first.
    pub fn send_ping(&self, callback: Callback<()>) -> io::Result<()> {
        let nonce = fastrand::u64(..);
        self.peer.timing.start_time.store(now_unix(), Ordering::Release);
        self.sender()?.send(commands::PING, &nonce.to_le_bytes())?;
        self.peer.push_pong_callback(callback);
        Ok(())
    }

    /// Re-request blocks from `from_block` onward: trims remembered block
    /// hashes back to that point and resends them as `getdata`.
    pub fn rerequest_blocks(&self, from_block: [u8; 32]) -> io::Result<()> {
        let hashes: Vec<[u8; 32]> = self.peer.with_locked(|l| {
            let mut kept = Vec::new();
            let mut found_from = false;
            let mut fresh = peer_state::HashMemory::default();
            for hash in l.known_block_hashes.iter() {
                if *hash == from_block {
                    found_from = true;
                }
                if found_from {
                    fresh.insert(*hash);
                    kept.push(*hash);
                }
            }
            l.known_block_hashes = fresh;
            kept
        });
        if hashes.is_empty() {
            return Ok(());
        }
        let items: Vec<InventoryItem> = hashes.iter().map(|h| InventoryItem::filtered_block(*h)).collect();
        let mut out = Vec::new();
        message::inventory::write_inventory(&items, &mut out);
        self.sender()?.send(commands::GETDATA, &out)
    }

    /// Release this handle's resources. Legal only once the reader thread
    /// has terminated (status `Disconnected`), matching the peer's
    /// exclusive-ownership resource policy (§5).
    pub fn free(self) {
        if let Some(conn) = self.connection {
            let _ = conn.reader.join();
        }
    }
}

fn now_unix() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_peer_is_disconnected_and_has_no_sender() {
        let handle = PeerHandle::new(constants::LOCAL_HOST, 8767, 0, 0);
        assert_eq!(handle.status(), Status::Disconnected);
        assert!(handle.send_getaddr().is_err());
    }

    #[test]
    fn schedule_disconnect_negative_disables_deadline() {
        let handle = PeerHandle::new(constants::LOCAL_HOST, 8767, 0, 0);
        handle.schedule_disconnect(-1);
        assert_eq!(handle.peer.timing.disconnect_time.load(Ordering::Acquire), DEADLINE_DISABLED);
    }
}
