//! Protocol-wide constants, bit-exact with the reference implementation.

use std::time::Duration;

/// Peer-to-peer protocol version advertised by this node.
pub const PROTOCOL_VERSION: u32 = 70027;
/// Minimum protocol version accepted from a remote peer.
pub const MIN_PROTO_VERSION: u32 = 70026;
/// Services bitmask this node advertises in its own `version` message.
pub const ENABLED_SERVICES: u64 = 0;
/// Remote peers are required to advertise `NODE_NETWORK` to be useful for sync.
pub const SERVICES_NODE_NETWORK: u64 = 1 << 0;
/// Bloom filter support, BIP 37.
pub const SERVICES_NODE_BLOOM: u64 = 1 << 2;

/// Size in bytes of the fixed message envelope (excluding payload).
pub const HEADER_LENGTH: usize = 24;
/// Maximum accepted payload length for any single message (32 MiB).
pub const MAX_MSG_LENGTH: u32 = 0x0200_0000;
/// Upper bound on the number of hashes retained for de-duplication purposes.
pub const MAX_GETDATA_HASHES: usize = 50_000;
/// `inv`/`getdata`/`notfound` vectors above this size are a protocol violation.
pub const MAX_INV_COUNT: usize = 50_000;
/// `addr` messages with more entries than this are silently dropped.
pub const MAX_ADDR_COUNT: usize = 1000;
/// Above this many announced tx hashes in a single `inv`, the peer is disconnected.
pub const MAX_INV_TX_COUNT: usize = 10_000;
/// `assetdata` payloads larger than this are dropped without being parsed.
pub const ASSET_DATA_MAX_PAYLOAD: usize = 16_898;
/// Transactions above this serialized size are never relayed via `getdata`.
pub const TX_MAX_SIZE: usize = 100_000;

/// Time allotted to complete the TCP handshake and the initial `version` round trip.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Time allotted for a single in-flight message to complete arriving once started.
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-syscall socket read/write timeout; the read loop polls deadlines between calls.
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(1);
/// Acceptable future-dated drift for block timestamps, mirrors Bitcoin's rule.
pub const BLOCK_MAX_TIME_DRIFT: Duration = Duration::from_secs(2 * 60 * 60);
/// Window added on top of 7 days when deciding whether header catch-up has finished.
pub const CATCHUP_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A `headers` message this size or larger always means more are coming.
pub const FULL_HEADERS_MESSAGE: usize = 2000;
/// Once an `inv` announces at least this many blocks, pipeline the next window.
pub const PIPELINE_BLOCKS_THRESHOLD: usize = 500;

/// On-wire size of a legacy (pre-KAWPOW) block header, not counting the tx-count byte.
pub const LEGACY_HEADER_SIZE: usize = 80;
/// On-wire size of a KAWPOW block header, not counting the tx-count byte.
pub const KAWPOW_HEADER_SIZE: usize = 120;
/// Every header on the wire is followed by a single placeholder tx-count byte.
pub const HEADER_TX_COUNT_PLACEHOLDER: usize = 1;
/// Byte offset of the 4-byte timestamp field within either header encoding.
pub const HEADER_TIMESTAMP_OFFSET: usize = 68;
/// Byte offset of the 8-byte KAWPOW nonce, only meaningful for 120-byte headers.
pub const HEADER_KAWPOW_NONCE_OFFSET: usize = 80;
/// Byte offset of the 32-byte KAWPOW mix hash, only meaningful for 120-byte headers.
pub const HEADER_KAWPOW_MIX_OFFSET: usize = 88;

/// Timestamp at which peers start sending/expecting 120-byte KAWPOW headers.
///
/// 2020-05-06T00:00:00Z, the Ravencoin mainnet KAWPOW activation.
pub const KAWPOW_ACTIVATION_TIME: u32 = 1_588_726_800;
/// Timestamp at which legacy headers switch from X16R to X16Rv2.
///
/// 2019-11-13T00:00:00Z, the Ravencoin mainnet X16Rv2 activation.
pub const X16RV2_ACTIVATION_TIME: u32 = 1_573_605_600;

/// `::ffff:127.0.0.1`, used as the "from" address in outbound `version` messages.
pub const LOCAL_HOST: [u8; 16] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 127, 0, 0, 1,
];
