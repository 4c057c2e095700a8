//! Ravencoin's asset extension: `getassetdata`, `assetdata`, and the
//! (on-wire-misspelled) `asstnotfound`.

use crate::error::CodecError;
use crate::varint::{read_varint, read_varstring, write_varint, write_varstring};

/// Sentinel name returned by a peer that has never heard of the requested asset.
const NOT_FOUND_NAME: &str = "_NF";

/// IPFS hashes are multihash-encoded; the wire always carries the
/// `sha2-256` variant, whose base58 rendering is exactly 47 characters.
const IPFS_HASH_BASE58_LEN: usize = 47;

/// Build a `getassetdata` payload requesting a single named asset.
///
/// The wire format always carries a leading count; this implementation only
/// ever sends one asset per request, mirroring how the core issues them.
pub fn encode_getassetdata(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    write_varint(1, &mut out);
    write_varstring(name.as_bytes(), &mut out);
    out
}

/// A single requested asset name, decoded from a `getassetdata` payload.
pub fn decode_getassetdata(buf: &[u8]) -> Result<Vec<String>, CodecError> {
    let (count, mut offset) = read_varint(buf)?;
    let mut names = Vec::new();
    for _ in 0..count {
        let (name, used) = read_varstring(&buf[offset..])?;
        names.push(String::from_utf8_lossy(&name).into_owned());
        offset += used;
    }
    Ok(names)
}

/// A decoded `assetdata` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetData {
    /// The peer has no knowledge of this asset.
    NotFound,
    /// Full asset metadata.
    Found {
        name: String,
        amount: u64,
        unit: u8,
        reissuable: bool,
        ipfs_hash: Option<String>,
    },
}

impl AssetData {
    /// Decode an `assetdata` payload.
    ///
    /// Payloads larger than [`crate::constants::ASSET_DATA_MAX_PAYLOAD`] are
    /// the caller's responsibility to drop before reaching this function;
    /// this only validates internal field bounds.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let (name_bytes, mut offset) = read_varstring(buf)?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();
        if name == NOT_FOUND_NAME {
            return Ok(Self::NotFound);
        }

        let amount = read_u64(buf, offset)?;
        offset += 8;
        let unit = *buf.get(offset).ok_or(CodecError::Truncated("assetdata"))?;
        offset += 1;
        let reissuable = *buf.get(offset).ok_or(CodecError::Truncated("assetdata"))? != 0;
        offset += 1;
        let has_ipfs = *buf.get(offset).ok_or(CodecError::Truncated("assetdata"))? != 0;
        offset += 1;

        let ipfs_hash = if has_ipfs {
            let (ipfs_bytes, used) = read_varstring(&buf[offset..])?;
            // Open question resolved in favor of the arithmetically correct
            // bound: the field must fit inside the message, not the reverse.
            if offset + used > buf.len() {
                return Err(CodecError::Truncated("assetdata"));
            }
            offset += used;
            Some(bs58::encode(&ipfs_bytes).into_string())
        } else {
            None
        };
        let _ = offset; // trailing block height, if present, isn't consumed

        Ok(Self::Found { name, amount, unit, reissuable, ipfs_hash })
    }
}

/// One entry of an `asstnotfound` payload: an asset the peer has no data for.
pub fn decode_asstnotfound(buf: &[u8]) -> Result<Vec<String>, CodecError> {
    let (count, mut offset) = read_varint(buf)?;
    let mut names = Vec::new();
    for _ in 0..count {
        let (name, used) = read_varstring(&buf[offset..])?;
        names.push(String::from_utf8_lossy(&name).into_owned());
        offset += used;
    }
    Ok(names)
}

fn read_u64(buf: &[u8], at: usize) -> Result<u64, CodecError> {
    let b = buf.get(at..at + 8).ok_or(CodecError::Truncated("assetdata"))?;
    let mut n = [0u8; 8];
    n.copy_from_slice(b);
    Ok(u64::from_le_bytes(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getassetdata_round_trip() {
        let encoded = encode_getassetdata("RVN/MYASSET");
        let names = decode_getassetdata(&encoded).unwrap();
        assert_eq!(names, vec!["RVN/MYASSET".to_string()]);
    }

    #[test]
    fn assetdata_not_found_sentinel() {
        let mut buf = Vec::new();
        write_varstring(NOT_FOUND_NAME.as_bytes(), &mut buf);
        assert_eq!(AssetData::decode(&buf).unwrap(), AssetData::NotFound);
    }

    #[test]
    fn assetdata_without_ipfs() {
        let mut buf = Vec::new();
        write_varstring(b"RVN/MYASSET", &mut buf);
        buf.extend_from_slice(&100_000_000u64.to_le_bytes());
        buf.push(8); // unit
        buf.push(1); // reissuable
        buf.push(0); // no ipfs hash
        let decoded = AssetData::decode(&buf).unwrap();
        assert_eq!(
            decoded,
            AssetData::Found {
                name: "RVN/MYASSET".to_string(),
                amount: 100_000_000,
                unit: 8,
                reissuable: true,
                ipfs_hash: None,
            }
        );
    }

    #[test]
    fn assetdata_with_ipfs_hash() {
        let mut buf = Vec::new();
        write_varstring(b"RVN/MYASSET", &mut buf);
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.push(0);
        buf.push(0);
        buf.push(1); // has ipfs hash
        let multihash = [0x12, 0x20].iter().copied().chain([7u8; 32]).collect::<Vec<u8>>();
        write_varstring(&multihash, &mut buf);

        let decoded = AssetData::decode(&buf).unwrap();
        match decoded {
            AssetData::Found { ipfs_hash: Some(h), .. } => {
                assert!(!h.is_empty());
                assert!(h.len() <= IPFS_HASH_BASE58_LEN + 1);
            }
            other => panic!("expected Found with ipfs hash, got {other:?}"),
        }
    }

    #[test]
    fn asstnotfound_round_trip() {
        let mut buf = Vec::new();
        write_varint(2, &mut buf);
        write_varstring(b"RVN/A", &mut buf);
        write_varstring(b"RVN/B", &mut buf);
        let names = decode_asstnotfound(&buf).unwrap();
        assert_eq!(names, vec!["RVN/A".to_string(), "RVN/B".to_string()]);
    }
}
