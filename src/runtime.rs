//! Peer runtime (§4.5): the blocking socket, its one reader thread, and the
//! dispatch table that turns arriving [`Message`]s into state transitions
//! and dispatcher-hook calls.
//!
//! Concurrency follows §5: the reader thread owns the socket for reading
//! and blocks on it; any other thread may call a `Send*` method, which
//! takes the coarse send mutex (O1) so outbound messages stay totally
//! ordered regardless of which thread issues them.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, trace, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::codec::{encode_message, Frame, FrameDecoder};
use crate::constants::{
    CONNECT_TIMEOUT, MAX_INV_TX_COUNT, MESSAGE_TIMEOUT, PIPELINE_BLOCKS_THRESHOLD, PROTOCOL_VERSION,
    SOCKET_TIMEOUT, TX_MAX_SIZE,
};
use crate::error::{ErrorCode, PeerError, ProtocolError};
use crate::external::MessageParser;
use crate::locator;
use crate::message::address::NetAddress;
use crate::message::inventory::{InvType, InventoryItem};
use crate::message::{commands, LocatorRequest, Message};
use crate::network::Network;
use crate::peer_state::{CurrentBlock, DEADLINE_DISABLED, Peer};
use crate::pow::{HeaderHasher, ProofOfWork};

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Translate a [`Peer`]'s v4-mapped-v6 address into the `SocketAddr` to dial,
/// preferring a real IPv6 connection but falling back to IPv4 for addresses
/// that are only ever v4-mapped.
fn socket_addr(addr: [u8; 16], port: u16) -> SocketAddr {
    let is_v4_mapped = addr[..10] == [0u8; 10] && addr[10..12] == [0xff, 0xff];
    if is_v4_mapped {
        let v4 = Ipv4Addr::new(addr[12], addr[13], addr[14], addr[15]);
        SocketAddr::V4(SocketAddrV4::new(v4, port))
    } else {
        let v6 = Ipv6Addr::from(addr);
        SocketAddr::V6(SocketAddrV6::new(v6, port, 0, 0))
    }
}

fn dial(addr: [u8; 16], port: u16) -> io::Result<Socket> {
    let target = socket_addr(addr, port);
    let domain = if target.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_keepalive(true)?;
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    socket.set_nosigpipe(true)?;
    socket.connect_timeout(&SockAddr::from(target), CONNECT_TIMEOUT)?;
    socket.set_read_timeout(Some(SOCKET_TIMEOUT))?;
    socket.set_write_timeout(Some(SOCKET_TIMEOUT))?;
    Ok(socket)
}

/// The outbound half of a connection: a mutex-guarded socket clone, so any
/// thread may call a `Send*` method and have its message serialized against
/// every other sender without the reader thread's involvement (§5 O1).
#[derive(Debug)]
pub struct Sender {
    socket: Mutex<Socket>,
    magic: u32,
}

impl Sender {
    fn new(socket: Socket, magic: u32) -> Self {
        Self { socket: Mutex::new(socket), magic }
    }

    /// Serialize and write one message, envelope included.
    pub fn send(&self, command: &str, payload: &[u8]) -> io::Result<()> {
        let wire = encode_message(self.magic, command, payload);
        let mut socket = self.socket.lock().unwrap();
        socket.write_all(&wire)
    }

    /// Shut down the socket for both directions, the only disconnect
    /// primitive (§5): the reader observes this as a read error or `Ok(0)`.
    pub fn shutdown(&self) {
        let socket = self.socket.lock().unwrap();
        let _ = socket.shutdown(std::net::Shutdown::Both);
    }
}

/// A live connection: its state, the means to send to it, and a join handle
/// for the reader thread so the owner can wait for clean teardown.
pub struct Connection {
    pub peer: Arc<Peer>,
    pub sender: Arc<Sender>,
    pub reader: thread::JoinHandle<()>,
}

/// Algorithms and parsers the peer runtime treats as opaque, bundled for a
/// single call to [`connect`].
pub struct Algorithms {
    pub pow: Arc<dyn ProofOfWork + Send + Sync>,
    pub hasher: Arc<dyn HeaderHasher + Send + Sync>,
    pub parser: Arc<dyn MessageParser + Send + Sync>,
}

/// Open a connection to `peer`, perform the handshake, and spawn the one
/// blocking reader thread this connection will live on for its lifetime.
pub fn connect(
    peer: Arc<Peer>,
    network: Network,
    local_addr: [u8; 16],
    local_port: u16,
    algorithms: Algorithms,
) -> io::Result<Connection> {
    if !(peer.hooks().network_is_reachable)() {
        return Err(io::Error::new(io::ErrorKind::NotConnected, "network unreachable"));
    }

    peer.timing.disconnect_time.store(now_unix() + CONNECT_TIMEOUT.as_secs(), Ordering::Release);

    let socket = dial(peer.addr, peer.port)?;
    let writer = socket.try_clone()?;
    let sender = Arc::new(Sender::new(writer, network.magic()));

    send_version(&sender, &peer, local_addr, local_port)?;
    peer.with_locked(|l| l.handshake.sent_version = true);

    let reader_peer = peer.clone();
    let reader_sender = sender.clone();
    let reader = thread::spawn(move || {
        run_reader_loop(reader_peer, socket, network, reader_sender, algorithms);
    });

    Ok(Connection { peer, sender, reader })
}

fn send_version(sender: &Sender, peer: &Peer, local_addr: [u8; 16], local_port: u16) -> io::Result<()> {
    let msg = crate::message::version::VersionMessage {
        version: PROTOCOL_VERSION,
        services: crate::constants::ENABLED_SERVICES,
        timestamp: now_unix(),
        recv_addr: NetAddress { time: None, services: peer.services, ip: peer.addr, port: peer.port },
        from_addr: NetAddress {
            time: None,
            services: crate::constants::ENABLED_SERVICES,
            ip: local_addr,
            port: local_port,
        },
        nonce: peer.local_nonce,
        user_agent: format!("/raven-peer:{}/", env!("CARGO_PKG_VERSION")),
        start_height: peer.timing.current_block_height.load(Ordering::Acquire),
        relay: true,
    };
    sender.send(commands::VERSION, &msg.encode())
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// The blocking read loop (§4.5): frames bytes off the wire, checks
/// cooperative deadlines between reads, and dispatches complete messages.
fn run_reader_loop(
    peer: Arc<Peer>,
    mut socket: Socket,
    network: Network,
    sender: Arc<Sender>,
    algorithms: Algorithms,
) {
    let mut decoder = FrameDecoder::new(network.magic());
    let mut buf = [0u8; 8192];
    let mut last_progress = now_unix();

    let code = 'reader: loop {
        let now = now_unix();
        let disconnect_at = peer.timing.disconnect_time.load(Ordering::Acquire);
        if disconnect_at != DEADLINE_DISABLED && now >= disconnect_at {
            break ErrorCode::Timeout;
        }
        let mempool_at = peer.timing.mempool_time.load(Ordering::Acquire);
        if mempool_at != DEADLINE_DISABLED && now >= mempool_at {
            chain_mempool_through_ping(&peer, &sender);
        }

        match socket.read(&mut buf) {
            Ok(0) => break ErrorCode::ConnReset,
            Ok(n) => {
                last_progress = now_unix();
                match decoder.push(&buf[..n]) {
                    Ok(frames) => {
                        for frame in frames {
                            if let Err(err) = dispatch(&peer, &sender, &frame, &algorithms) {
                                warn!(target: "p2p", "protocol error from {:?}: {}", peer.addr, err);
                                break 'reader err.code();
                            }
                        }
                    }
                    Err(err) => {
                        warn!(target: "p2p", "framing error from {:?}: {}", peer.addr, err);
                        break 'reader err.code();
                    }
                }
            }
            Err(err) if is_retryable(&err) => {
                if decoder.buffered() > 0
                    && now_unix().saturating_sub(last_progress) >= MESSAGE_TIMEOUT.as_secs()
                {
                    break ErrorCode::Timeout;
                }
            }
            Err(err) => break PeerError::Io(err).code(),
        }
    };

    let _ = socket.shutdown(std::net::Shutdown::Both);
    peer.finish_with_error(code);
    (peer.hooks().thread_cleanup)();
}

/// Send a `ping` and register `on_pong` as the callback its matching `pong`
/// will invoke. Used both for the periodic mempool-deadline check (with a
/// no-op callback) and to chain an armed mempool callback through to the
/// next `pong` once its tx has been observed (§3 I5, §4.2 `inv`).
fn send_ping(peer: &Peer, sender: &Sender, on_pong: crate::peer_state::Callback<()>) {
    let nonce = fastrand::u64(..);
    peer.timing.start_time.store(now_unix(), Ordering::Release);
    if sender.send(commands::PING, &nonce.to_le_bytes()).is_ok() {
        peer.push_pong_callback(on_pong);
    } else {
        on_pong(Err(ErrorCode::ConnReset));
    }
}

fn chain_mempool_through_ping(peer: &Peer, sender: &Sender) {
    peer.timing.mempool_time.store(DEADLINE_DISABLED, Ordering::Release);
    send_ping(peer, sender, Box::new(|_| {}));
}

/// Turn one decoded message into state updates, outbound replies, and hook
/// invocations. Errors here are always fatal framing/protocol violations;
/// policy drops (oversized `addr`, unsolicited `addr`, `reject`) are handled
/// inline and never surface as an `Err`.
fn dispatch(
    peer: &Peer,
    sender: &Sender,
    frame: &Frame,
    algorithms: &Algorithms,
) -> Result<(), PeerError> {
    trace!(target: "p2p", "<- {} ({} bytes) from {:?}", frame.command, frame.payload.len(), peer.addr);

    // A non-tx message arriving mid-merkleblock abandons the pending block
    // without delivering it; that abandonment is itself the protocol error.
    if frame.command != commands::TX {
        let abandoned = peer.with_locked(|l| {
            let was_awaiting = matches!(l.current_block, CurrentBlock::AwaitingTx { .. });
            l.current_block = CurrentBlock::Idle;
            was_awaiting
        });
        if abandoned {
            return Err(PeerError::Protocol(ProtocolError::OutOfOrder(
                "merkleblock abandoned by a non-tx message",
            )));
        }
    }

    let message = Message::decode(frame).map_err(PeerError::from)?;
    match message {
        Message::Version(v) => {
            if v.version < crate::constants::MIN_PROTO_VERSION {
                return Err(PeerError::Protocol(ProtocolError::OutOfOrder(
                    "peer protocol version below minimum",
                )));
            }
            let (version, user_agent, start_height) = (v.version, v.user_agent, v.start_height);
            peer.with_locked(|l| {
                l.remote_version = version;
                l.user_agent = user_agent;
                l.last_block = start_height;
                l.handshake.sent_verack = true;
            });
            sender.send(commands::VERACK, &[]).map_err(io_err)?;
        }
        Message::Verack => {
            let became_connected = peer.with_locked(|l| {
                l.handshake.got_verack = true;
                l.handshake.sent_verack && l.handshake.got_verack
            });
            if became_connected {
                (peer.hooks().connected)();
            }
        }
        Message::Ping(nonce) => {
            sender.send(commands::PONG, &nonce.to_le_bytes()).map_err(io_err)?;
        }
        Message::Pong(nonce) => {
            handle_pong(peer, nonce)?;
        }
        Message::GetAddr => {
            let mut out = Vec::new();
            crate::varint::write_varint(0, &mut out);
            sender.send(commands::ADDR, &out).map_err(io_err)?;
        }
        Message::Addr(addrs) => {
            handle_addr(peer, addrs);
        }
        Message::Inv(items) => {
            handle_inv(peer, sender, items)?;
        }
        Message::GetData(items) => {
            handle_getdata(peer, sender, items)?;
        }
        Message::NotFound(items) => {
            let (tx, blocks): (Vec<_>, Vec<_>) =
                items.into_iter().partition(|i| matches!(i.kind, InvType::Tx));
            let mut all = tx;
            all.extend(blocks);
            (peer.hooks().notfound)(&all);
        }
        Message::Headers(raw) => {
            handle_headers(peer, sender, &raw, algorithms)?;
        }
        Message::Tx(raw) => {
            handle_tx(peer, &raw, algorithms)?;
        }
        Message::MerkleBlock(raw) => {
            handle_merkleblock(peer, &raw, algorithms)?;
        }
        Message::Reject(r) => {
            if let Some(hash) = r.tx_hash {
                (peer.hooks().rejected_tx)(hash, r.code);
            }
        }
        Message::FeeFilter(fee) => {
            peer.with_locked(|l| l.fee_per_kb = fee);
            (peer.hooks().set_fee_per_kb)(fee);
        }
        Message::GetAssetData(_) => {
            // Inbound `getassetdata` requests aren't served: this crate only
            // issues them, never answers them (no asset store to consult).
        }
        Message::AssetData(data) => {
            handle_assetdata(peer, data);
        }
        Message::AsstNotFound(names) => {
            let matches_outstanding = peer.with_locked(|l| {
                l.outstanding.asset.as_ref().is_some_and(|(name, _)| names.contains(name))
            });
            if matches_outstanding {
                handle_assetdata(peer, crate::message::asset::AssetData::NotFound);
            }
        }
        Message::GetHeaders(_) | Message::GetBlocks(_) => {
            // This crate is a client-side SPV peer connection; it never
            // serves chain data to the remote side.
        }
        Message::Mempool | Message::FilterLoad(_) | Message::Unknown { .. } => {}
    }
    Ok(())
}

fn io_err(err: io::Error) -> PeerError {
    PeerError::Io(err)
}

fn handle_pong(peer: &Peer, nonce: u64) -> Result<(), PeerError> {
    let _ = nonce; // the nonce's only role is liveness; this implementation trusts FIFO order.
    let Some(cb) = peer.pop_pong_callback() else {
        return Err(PeerError::Protocol(ProtocolError::UnexpectedPong));
    };
    let start = peer.timing.start_time.swap(0, Ordering::AcqRel);
    if start != 0 {
        let rtt_ms = now_unix().saturating_sub(start) * 1000;
        let old = peer.timing.ping_time_ms.load(Ordering::Acquire);
        let smoothed = if old == 0 { rtt_ms } else { (old + rtt_ms) / 2 };
        peer.timing.ping_time_ms.store(smoothed, Ordering::Release);
    }
    cb(Ok(()));
    Ok(())
}

fn handle_addr(peer: &Peer, addrs: Vec<NetAddress>) {
    let sent_getaddr = peer.with_locked(|l| l.requests.sent_getaddr);
    if !sent_getaddr {
        debug!(target: "p2p", "ignoring unsolicited addr from {:?}", peer.addr);
        return;
    }
    if addrs.len() > crate::constants::MAX_ADDR_COUNT {
        debug!(target: "p2p", "dropping oversized addr ({} entries) from {:?}", addrs.len(), peer.addr);
        return;
    }
    let now = now_unix();
    let usable: Vec<NetAddress> = addrs
        .into_iter()
        .filter(|a| a.services & crate::constants::SERVICES_NODE_NETWORK != 0 && a.is_ipv4())
        .map(|mut a| {
            let t = a.time.unwrap_or(0);
            let too_new = t as u64 > now + 600;
            a.time = Some(if t == 0 || too_new {
                (now - 5 * 24 * 60 * 60) as u32
            } else {
                t.saturating_sub(2 * 60 * 60)
            });
            a
        })
        .collect();
    (peer.hooks().relayed_peers)(&usable);
}

fn handle_inv(peer: &Peer, sender: &Sender, items: Vec<InventoryItem>) -> Result<(), PeerError> {
    let sent_filter = peer.with_locked(|l| l.requests.sent_filter);
    let sent_mempool = peer.timing.sent_mempool.load(Ordering::Acquire);
    let sent_getblocks = peer.with_locked(|l| l.requests.sent_getblocks);

    let tx_count = items.iter().filter(|i| matches!(i.kind, InvType::Tx)).count();
    if tx_count > 0 && !sent_filter && !sent_mempool && !sent_getblocks {
        return Err(PeerError::Protocol(ProtocolError::OutOfOrder("got inv before filter")));
    }
    if tx_count > MAX_INV_TX_COUNT {
        return Err(PeerError::Protocol(ProtocolError::OutOfOrder("too many tx in inv")));
    }

    let block_items: Vec<&InventoryItem> =
        items.iter().filter(|i| matches!(i.kind, InvType::Block | InvType::FilteredBlock)).collect();
    let block_count = block_items.len();
    let current_height = peer.timing.current_block_height.load(Ordering::Acquire);
    let remote_last_block = peer.with_locked(|l| l.last_block);
    if current_height > 0
        && block_count > 2
        && block_count < 500
        && current_height + block_count as u32 < remote_last_block
    {
        return Err(PeerError::Protocol(ProtocolError::NonStandardInv));
    }

    let needs_filter_update = peer.timing.needs_filter_update.load(Ordering::Acquire);

    let mut getdata_items = Vec::new();
    for item in &items {
        match item.kind {
            InvType::Tx => {
                if (peer.hooks().has_tx)(item.hash) {
                    continue;
                }
                getdata_items.push(*item);

                let cb = peer.with_locked(|l| l.outstanding.mempool.take().map(|(_, cb)| cb));
                if let Some(cb) = cb {
                    send_ping(peer, sender, Box::new(move |res| cb(res)));
                }
            }
            InvType::Block | InvType::FilteredBlock => {
                if needs_filter_update {
                    continue;
                }
                let is_known = peer.with_locked(|l| l.last_block_hash == Some(item.hash));
                if !is_known {
                    peer.with_locked(|l| {
                        l.last_block_hash = Some(item.hash);
                        l.known_block_hashes.insert_capped(item.hash, crate::peer_state::MAX_KNOWN_BLOCK_HASHES);
                    });
                    getdata_items.push(InventoryItem::filtered_block(item.hash));
                }
            }
            InvType::Unknown(_) => {}
        }
    }

    if !getdata_items.is_empty() {
        let mut out = Vec::new();
        crate::message::inventory::write_inventory(&getdata_items, &mut out);
        sender.send(commands::GETDATA, &out).map_err(io_err)?;
    }

    if block_count >= PIPELINE_BLOCKS_THRESHOLD {
        if let (Some(first), Some(last)) = (block_items.first(), block_items.last()) {
            let req = LocatorRequest {
                version: PROTOCOL_VERSION,
                locators: vec![last.hash, first.hash],
                hash_stop: [0; 32],
            };
            sender.send(commands::GETBLOCKS, &req.encode()).map_err(io_err)?;
        }
    }

    Ok(())
}

fn handle_getdata(peer: &Peer, sender: &Sender, items: Vec<InventoryItem>) -> Result<(), PeerError> {
    let mut not_found = Vec::new();
    for item in items {
        match item.kind {
            InvType::Tx => {
                if let Some(tx) = (peer.hooks().requested_tx)(item.hash) {
                    if tx.len() < TX_MAX_SIZE {
                        sender.send(commands::TX, &tx).map_err(io_err)?;
                        continue;
                    }
                }
                not_found.push(item);
            }
            _ => not_found.push(item),
        }
    }
    if !not_found.is_empty() {
        let mut out = Vec::new();
        crate::message::inventory::write_inventory(&not_found, &mut out);
        sender.send(commands::NOTFOUND, &out).map_err(io_err)?;
    }
    Ok(())
}

fn handle_headers(
    peer: &Peer,
    sender: &Sender,
    raw: &[u8],
    algorithms: &Algorithms,
) -> Result<(), PeerError> {
    let headers = locator::split_headers(raw).map_err(PeerError::from)?;
    locator::validate_headers(algorithms.pow.as_ref(), &headers).map_err(PeerError::from)?;

    if headers.is_empty() {
        return Ok(());
    }

    for header in &headers {
        let hash = crate::pow::block_hash(algorithms.hasher.as_ref(), header.as_view());
        (peer.hooks().relayed_block)(header.as_view().as_bytes(), &[hash]);
    }
    peer.timing.current_block_height.fetch_add(headers.len() as u32, Ordering::AcqRel);

    let earliest_key_time = peer.timing.earliest_key_time.load(Ordering::Acquire);
    match locator::plan_next_request(algorithms.hasher.as_ref(), &headers, earliest_key_time) {
        locator::NextRequest::GetBlocks(locators) => {
            let req = LocatorRequest { version: PROTOCOL_VERSION, locators, hash_stop: [0; 32] };
            sender.send(commands::GETBLOCKS, &req.encode()).map_err(io_err)?;
        }
        locator::NextRequest::GetHeaders(locators) => {
            let req = LocatorRequest { version: PROTOCOL_VERSION, locators, hash_stop: [0; 32] };
            sender.send(commands::GETHEADERS, &req.encode()).map_err(io_err)?;
        }
        locator::NextRequest::None => {}
    }
    Ok(())
}

fn handle_tx(peer: &Peer, raw: &[u8], algorithms: &Algorithms) -> Result<(), PeerError> {
    let sent_filter = peer.with_locked(|l| l.requests.sent_filter);
    let sent_getdata = peer.with_locked(|l| l.requests.sent_getdata);
    if !sent_filter && !sent_getdata {
        return Err(PeerError::Protocol(ProtocolError::OutOfOrder("got tx before filter/getdata")));
    }
    let hash = algorithms.parser.tx_hash(raw);

    let delivered = peer.with_locked(|l| {
        l.known_tx_hashes.insert(hash);
        if let CurrentBlock::AwaitingTx { pending_tx_hashes, .. } = &mut l.current_block {
            pending_tx_hashes.retain(|h| *h != hash);
            if pending_tx_hashes.is_empty() {
                let done = std::mem::replace(&mut l.current_block, CurrentBlock::Idle);
                return Some(done);
            }
        }
        None
    });
    if let Some(CurrentBlock::AwaitingTx { header, .. }) = delivered {
        (peer.hooks().relayed_block)(&header, &[]);
    }
    (peer.hooks().relayed_tx)(raw);
    Ok(())
}

fn handle_merkleblock(peer: &Peer, raw: &[u8], algorithms: &Algorithms) -> Result<(), PeerError> {
    let sent_filter = peer.with_locked(|l| l.requests.sent_filter);
    let sent_getdata = peer.with_locked(|l| l.requests.sent_getdata);
    if !sent_filter || !sent_getdata {
        return Err(PeerError::Protocol(ProtocolError::OutOfOrder("got merkleblock before filter/getdata")));
    }
    let parsed = algorithms
        .parser
        .parse_merkleblock(raw, now_unix())
        .ok_or(PeerError::Protocol(ProtocolError::InvalidBlock))?;

    let unknown: Vec<[u8; 32]> = peer.with_locked(|l| {
        parsed
            .matched_tx_hashes
            .iter()
            .rev()
            .filter(|h| !l.known_tx_hashes.contains(h))
            .copied()
            .collect()
    });

    if unknown.is_empty() {
        (peer.hooks().relayed_block)(&parsed.header, &parsed.matched_tx_hashes);
    } else {
        peer.with_locked(|l| {
            l.current_block = CurrentBlock::AwaitingTx { header: parsed.header, pending_tx_hashes: unknown };
        });
    }
    Ok(())
}

fn handle_assetdata(peer: &Peer, data: crate::message::asset::AssetData) {
    let cb = peer.with_locked(|l| l.outstanding.asset.take());
    if let Some((_name, cb)) = cb {
        match data {
            crate::message::asset::AssetData::NotFound => cb(Ok(None)),
            found => cb(Ok(Some(found))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_mapped_address_dials_ipv4() {
        let addr = crate::constants::LOCAL_HOST;
        match socket_addr(addr, 8767) {
            SocketAddr::V4(v4) => assert_eq!(v4.ip(), &Ipv4Addr::new(127, 0, 0, 1)),
            SocketAddr::V6(_) => panic!("expected IPv4"),
        }
    }

    #[test]
    fn non_mapped_address_dials_ipv6() {
        let addr = [0x20, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        match socket_addr(addr, 8767) {
            SocketAddr::V6(_) => {}
            SocketAddr::V4(_) => panic!("expected IPv6"),
        }
    }
}
