//! Header-chain locator engine (§4.4): decodes the mixed legacy/KAWPOW
//! header sequence carried by a single `headers` message, validates each
//! header's proof-of-work, and picks the next `getheaders`/`getblocks`
//! request to keep the chain advancing toward the wallet's earliest key
//! time.

use crate::constants::{
    CATCHUP_WINDOW, FULL_HEADERS_MESSAGE, HEADER_TIMESTAMP_OFFSET, KAWPOW_ACTIVATION_TIME,
    KAWPOW_HEADER_SIZE, LEGACY_HEADER_SIZE,
};
use crate::error::{CodecError, ProtocolError};
use crate::message::Locators;
use crate::pow::{block_hash, Header, HeaderHasher, ProofOfWork};
use crate::varint::read_varint;

/// One header from a `headers` message, owning its bytes and tagged by which
/// proof-of-work family it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedHeader {
    Legacy([u8; LEGACY_HEADER_SIZE]),
    Kawpow([u8; KAWPOW_HEADER_SIZE]),
}

impl OwnedHeader {
    /// Borrow this header as the view type the proof-of-work seam expects.
    pub fn as_view(&self) -> Header<'_> {
        match self {
            OwnedHeader::Legacy(b) => Header::Legacy(b),
            OwnedHeader::Kawpow(b) => Header::Kawpow(b),
        }
    }

    /// The 4-byte timestamp field, common to both encodings.
    pub fn timestamp(&self) -> u32 {
        self.as_view().timestamp()
    }
}

/// Decode a `headers` payload into its sequence of owned headers.
///
/// A single message may be purely legacy, purely KAWPOW, or a legacy prefix
/// followed by a KAWPOW suffix (never the reverse, since chain timestamps
/// only increase): the boundary is found by reading each candidate header's
/// timestamp at the shared offset 68 and switching encodings the first time
/// it reaches the KAWPOW activation time.
pub fn split_headers(payload: &[u8]) -> Result<Vec<OwnedHeader>, CodecError> {
    let (count, mut offset) = read_varint(payload)?;
    let mut headers = Vec::with_capacity(count.min(FULL_HEADERS_MESSAGE as u64 * 2) as usize);

    for _ in 0..count {
        let ts_bytes = payload
            .get(offset + HEADER_TIMESTAMP_OFFSET..offset + HEADER_TIMESTAMP_OFFSET + 4)
            .ok_or(CodecError::Truncated("headers"))?;
        let timestamp = u32::from_le_bytes([ts_bytes[0], ts_bytes[1], ts_bytes[2], ts_bytes[3]]);

        if timestamp < KAWPOW_ACTIVATION_TIME {
            // Legacy header plus its trailing tx-count placeholder byte.
            let bytes = payload
                .get(offset..offset + LEGACY_HEADER_SIZE)
                .ok_or(CodecError::Truncated("headers"))?;
            let mut header = [0u8; LEGACY_HEADER_SIZE];
            header.copy_from_slice(bytes);
            headers.push(OwnedHeader::Legacy(header));
            offset += LEGACY_HEADER_SIZE + 1;
        } else {
            let bytes = payload
                .get(offset..offset + KAWPOW_HEADER_SIZE)
                .ok_or(CodecError::Truncated("headers"))?;
            let mut header = [0u8; KAWPOW_HEADER_SIZE];
            header.copy_from_slice(bytes);
            headers.push(OwnedHeader::Kawpow(header));
            offset += KAWPOW_HEADER_SIZE + 1;
        }
    }
    Ok(headers)
}

/// Validate every header's proof-of-work; the first failure is fatal.
pub fn validate_headers(pow: &dyn ProofOfWork, headers: &[OwnedHeader]) -> Result<(), ProtocolError> {
    for header in headers {
        if !pow.verify(header.as_view()) {
            return Err(ProtocolError::InvalidBlock);
        }
    }
    Ok(())
}

/// Compute the pair of locator hashes for a header window: the window's
/// tail header followed by its head header, in that order.
pub fn window_locators(hasher: &dyn HeaderHasher, headers: &[OwnedHeader]) -> Option<Locators> {
    let tail = headers.last()?;
    let head = headers.first()?;
    Some(vec![block_hash(hasher, tail.as_view()), block_hash(hasher, head.as_view())])
}

/// `true` if this `headers` message implies the peer has more to send: a
/// full-size batch, or the chain is still well behind the wallet's earliest
/// key time.
pub fn is_catching_up(headers: &[OwnedHeader], earliest_key_time: u32) -> bool {
    if headers.len() >= FULL_HEADERS_MESSAGE {
        return true;
    }
    let Some(last) = headers.last() else { return false };
    let cutoff = last.timestamp() as u64 + CATCHUP_WINDOW.as_secs() + crate::constants::BLOCK_MAX_TIME_DRIFT.as_secs();
    cutoff < earliest_key_time as u64
}

/// What to request next after processing one `headers` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextRequest {
    /// Still catching up to the wallet's earliest key time: keep requesting
    /// full blocks rather than just headers.
    GetBlocks(Locators),
    /// Caught up (or close enough): headers are sufficient from here on.
    GetHeaders(Locators),
    /// Nothing to request; this window didn't move the chain forward.
    None,
}

/// Decide the next request after a `headers` message, given the window just
/// decoded and the wallet's earliest key time.
pub fn plan_next_request(
    hasher: &dyn HeaderHasher,
    headers: &[OwnedHeader],
    earliest_key_time: u32,
) -> NextRequest {
    let Some(locators) = window_locators(hasher, headers) else {
        return NextRequest::None;
    };
    if is_catching_up(headers, earliest_key_time) {
        NextRequest::GetBlocks(locators)
    } else {
        NextRequest::GetHeaders(locators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pow::{AcceptAll, StubHasher};

    fn legacy_header(timestamp: u32) -> Vec<u8> {
        let mut h = vec![0u8; LEGACY_HEADER_SIZE];
        h[HEADER_TIMESTAMP_OFFSET..HEADER_TIMESTAMP_OFFSET + 4]
            .copy_from_slice(&timestamp.to_le_bytes());
        h.push(0); // tx-count placeholder
        h
    }

    fn kawpow_header(timestamp: u32) -> Vec<u8> {
        let mut h = vec![0u8; KAWPOW_HEADER_SIZE];
        h[HEADER_TIMESTAMP_OFFSET..HEADER_TIMESTAMP_OFFSET + 4]
            .copy_from_slice(&timestamp.to_le_bytes());
        h.push(0);
        h
    }

    #[test]
    fn splits_purely_legacy_message() {
        let mut payload = Vec::new();
        crate::varint::write_varint(2, &mut payload);
        payload.extend(legacy_header(1_000));
        payload.extend(legacy_header(1_001));

        let headers = split_headers(&payload).unwrap();
        assert_eq!(headers.len(), 2);
        assert!(matches!(headers[0], OwnedHeader::Legacy(_)));
        assert!(matches!(headers[1], OwnedHeader::Legacy(_)));
    }

    #[test]
    fn splits_mixed_legacy_then_kawpow_message() {
        let mut payload = Vec::new();
        crate::varint::write_varint(4, &mut payload);
        payload.extend(legacy_header(KAWPOW_ACTIVATION_TIME - 2));
        payload.extend(legacy_header(KAWPOW_ACTIVATION_TIME - 1));
        payload.extend(kawpow_header(KAWPOW_ACTIVATION_TIME));
        payload.extend(kawpow_header(KAWPOW_ACTIVATION_TIME + 1));

        let headers = split_headers(&payload).unwrap();
        assert_eq!(headers.len(), 4);
        assert!(matches!(headers[0], OwnedHeader::Legacy(_)));
        assert!(matches!(headers[1], OwnedHeader::Legacy(_)));
        assert!(matches!(headers[2], OwnedHeader::Kawpow(_)));
        assert!(matches!(headers[3], OwnedHeader::Kawpow(_)));
    }

    #[test]
    fn two_thousand_headers_is_still_catching_up() {
        let mut payload = Vec::new();
        crate::varint::write_varint(FULL_HEADERS_MESSAGE as u64, &mut payload);
        for i in 0..FULL_HEADERS_MESSAGE {
            payload.extend(legacy_header(1_000 + i as u32));
        }
        let headers = split_headers(&payload).unwrap();
        assert!(is_catching_up(&headers, u32::MAX));
    }

    #[test]
    fn small_recent_batch_is_not_catching_up() {
        let mut payload = Vec::new();
        crate::varint::write_varint(1, &mut payload);
        payload.extend(legacy_header(1_000));
        let headers = split_headers(&payload).unwrap();
        assert!(!is_catching_up(&headers, 0));
    }

    #[test]
    fn plan_next_request_prefers_getblocks_while_behind() {
        let mut payload = Vec::new();
        crate::varint::write_varint(1, &mut payload);
        payload.extend(legacy_header(1_000));
        let headers = split_headers(&payload).unwrap();
        match plan_next_request(&StubHasher, &headers, u32::MAX) {
            NextRequest::GetBlocks(locators) => assert_eq!(locators.len(), 2),
            other => panic!("expected GetBlocks, got {other:?}"),
        }
    }

    #[test]
    fn window_locators_orders_tail_before_head() {
        let mut payload = Vec::new();
        crate::varint::write_varint(2, &mut payload);
        payload.extend(legacy_header(KAWPOW_ACTIVATION_TIME - 1));
        payload.extend(kawpow_header(KAWPOW_ACTIVATION_TIME));
        let headers = split_headers(&payload).unwrap();

        let locators = window_locators(&StubHasher, &headers).unwrap();
        assert_eq!(locators.len(), 2);
        assert_eq!(locators[0], block_hash(&StubHasher, headers[1].as_view()), "first locator must be the tail (last) header's hash");
        assert_eq!(locators[1], block_hash(&StubHasher, headers[0].as_view()), "second locator must be the head (first) header's hash");
        assert_ne!(locators[0], locators[1]);
    }

    #[test]
    fn validate_headers_rejects_invalid_proof_of_work() {
        struct RejectAll;
        impl ProofOfWork for RejectAll {
            fn verify(&self, _header: Header<'_>) -> bool {
                false
            }
        }
        let mut payload = Vec::new();
        crate::varint::write_varint(1, &mut payload);
        payload.extend(legacy_header(1_000));
        let headers = split_headers(&payload).unwrap();
        assert_eq!(validate_headers(&RejectAll, &headers), Err(ProtocolError::InvalidBlock));
        assert_eq!(validate_headers(&AcceptAll, &headers), Ok(()));
    }
}
