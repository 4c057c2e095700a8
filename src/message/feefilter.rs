//! BIP133 `feefilter`: a minimum relay fee the peer asks us to respect.

use crate::error::CodecError;

/// Decode a `feefilter` payload into its fee-per-kilobyte, in satoshis.
pub fn decode_fee_per_kb(buf: &[u8]) -> Result<u64, CodecError> {
    let b = buf.get(..8).ok_or(CodecError::Truncated("feefilter"))?;
    let mut n = [0u8; 8];
    n.copy_from_slice(b);
    Ok(u64::from_le_bytes(n))
}

/// Encode a `feefilter` payload from a fee-per-kilobyte.
pub fn encode_fee_per_kb(fee_per_kb: u64) -> Vec<u8> {
    fee_per_kb.to_le_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let encoded = encode_fee_per_kb(1_000);
        assert_eq!(decode_fee_per_kb(&encoded).unwrap(), 1_000);
    }

    #[test]
    fn truncated_is_error() {
        assert!(decode_fee_per_kb(&[0u8; 4]).is_err());
    }
}
