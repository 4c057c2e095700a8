//! `ping`/`pong`: an 8-byte nonce, echoed back verbatim.

use crate::error::CodecError;

/// Decode a `ping` or `pong` payload into its nonce.
pub fn decode_nonce(buf: &[u8]) -> Result<u64, CodecError> {
    let b = buf.get(..8).ok_or(CodecError::Truncated("ping/pong"))?;
    let mut n = [0u8; 8];
    n.copy_from_slice(b);
    Ok(u64::from_le_bytes(n))
}

/// Encode a `ping` or `pong` payload from its nonce.
pub fn encode_nonce(nonce: u64) -> Vec<u8> {
    nonce.to_le_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let encoded = encode_nonce(0x0123_4567_89ab_cdef);
        assert_eq!(decode_nonce(&encoded).unwrap(), 0x0123_4567_89ab_cdef);
    }

    #[test]
    fn truncated_is_error() {
        assert!(decode_nonce(&[0u8; 4]).is_err());
    }
}
