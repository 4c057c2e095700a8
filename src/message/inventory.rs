//! The `(type, hash)` vector shared by `inv`, `getdata`, and `notfound`.

use crate::error::CodecError;
use crate::varint::{read_varint, write_varint};

/// An inventory item's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvType {
    /// A transaction.
    Tx,
    /// A full block.
    Block,
    /// A block requested via a bloom filter (merkleblock reply).
    FilteredBlock,
    /// Any type not recognized by this implementation.
    Unknown(u32),
}

impl InvType {
    fn from_u32(n: u32) -> Self {
        match n {
            1 => Self::Tx,
            2 => Self::Block,
            3 => Self::FilteredBlock,
            other => Self::Unknown(other),
        }
    }

    fn to_u32(self) -> u32 {
        match self {
            Self::Tx => 1,
            Self::Block => 2,
            Self::FilteredBlock => 3,
            Self::Unknown(n) => n,
        }
    }
}

/// One `(type, hash)` inventory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryItem {
    /// What kind of object this hash identifies.
    pub kind: InvType,
    /// Object hash, wire byte order.
    pub hash: [u8; 32],
}

impl InventoryItem {
    /// Construct a `tx`-typed entry.
    pub fn tx(hash: [u8; 32]) -> Self {
        Self { kind: InvType::Tx, hash }
    }

    /// Construct a `filtered_block`-typed entry.
    pub fn filtered_block(hash: [u8; 32]) -> Self {
        Self { kind: InvType::FilteredBlock, hash }
    }
}

/// Decode a varint-prefixed vector of inventory items, rejecting counts above
/// `limit` as a fatal protocol violation.
pub fn read_inventory(buf: &[u8], limit: usize, label: &'static str) -> Result<Vec<InventoryItem>, CodecError> {
    let (count, mut offset) = read_varint(buf)?;
    let count = count as usize;
    if count > limit {
        return Err(CodecError::CountExceeded(label, count));
    }
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let kind = buf
            .get(offset..offset + 4)
            .ok_or(CodecError::Truncated(label))?;
        let kind = InvType::from_u32(u32::from_le_bytes([kind[0], kind[1], kind[2], kind[3]]));
        let hash = buf
            .get(offset + 4..offset + 36)
            .ok_or(CodecError::Truncated(label))?;
        let mut h = [0u8; 32];
        h.copy_from_slice(hash);
        items.push(InventoryItem { kind, hash: h });
        offset += 36;
    }
    Ok(items)
}

/// Encode a varint-prefixed vector of inventory items.
pub fn write_inventory(items: &[InventoryItem], out: &mut Vec<u8>) {
    write_varint(items.len() as u64, out);
    for item in items {
        out.extend_from_slice(&item.kind.to_u32().to_le_bytes());
        out.extend_from_slice(&item.hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let items = vec![InventoryItem::tx([1; 32]), InventoryItem::filtered_block([2; 32])];
        let mut buf = Vec::new();
        write_inventory(&items, &mut buf);
        let decoded = read_inventory(&buf, 50_000, "inv").unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn count_above_limit_is_fatal() {
        let mut buf = Vec::new();
        write_varint(50_001, &mut buf);
        assert_eq!(
            read_inventory(&buf, 50_000, "inv"),
            Err(CodecError::CountExceeded("inv", 50_001))
        );
    }
}
