//! Seams for the transaction and merkle-block parsing this crate doesn't
//! own (§1 Non-goals): full parsing of `tx` and `merkleblock` payloads is
//! the peer manager's responsibility. This crate only needs a transaction's
//! hash, and a merkle block's header bytes, matched-transaction hashes, and
//! validity against the current time.

/// A `merkleblock` payload, parsed down to what the runtime needs to track
/// an in-progress block (§3 I3, §4.2 `merkleblock`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMerkleBlock {
    /// The block header bytes, legacy or KAWPOW, to hand to the
    /// `relayedBlock` hook once every matched transaction has arrived.
    pub header: Vec<u8>,
    /// Transaction hashes the filter matched, in reverse delivery order so
    /// the common case (arriving in broadcast order) pops from the tail.
    pub matched_tx_hashes: Vec<[u8; 32]>,
}

/// Parses `tx` and `merkleblock` payloads. Implementations wrap whatever
/// external transaction/block library the peer manager already depends on.
pub trait MessageParser {
    /// The transaction's hash, used for known-hash bookkeeping and to match
    /// against a pending merkle block's matched-hash list.
    fn tx_hash(&self, raw: &[u8]) -> [u8; 32];

    /// Parse and validate a `merkleblock` payload against the given
    /// reference time (mirrors `BRMerkleBlockIsValid`). `None` means the
    /// block failed validation and the connection must be torn down.
    fn parse_merkleblock(&self, raw: &[u8], now: u64) -> Option<ParsedMerkleBlock>;
}

#[cfg(test)]
/// A `MessageParser` for tests: transaction hashes are the payload's
/// checksum padded to 32 bytes, and merkle blocks carry no matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubMessageParser;

#[cfg(test)]
impl MessageParser for StubMessageParser {
    fn tx_hash(&self, raw: &[u8]) -> [u8; 32] {
        let checksum = crate::codec::checksum(raw);
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&checksum);
        hash
    }

    fn parse_merkleblock(&self, raw: &[u8], _now: u64) -> Option<ParsedMerkleBlock> {
        Some(ParsedMerkleBlock { header: raw.to_vec(), matched_tx_hashes: Vec::new() })
    }
}
