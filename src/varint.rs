//! Bitcoin-style variable-length integer encoding (§4.1).
//!
//! Pure functions over byte buffers; the reader accepts any valid encoding of a
//! value including non-minimal ones, matching the reference implementation.

use crate::error::CodecError;

/// Decode a varint from the front of `buf`.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn read_varint(buf: &[u8]) -> Result<(u64, usize), CodecError> {
    let tag = *buf.first().ok_or(CodecError::Truncated("varint"))?;
    match tag {
        0xFF => {
            let bytes = buf
                .get(1..9)
                .ok_or(CodecError::Truncated("varint"))?;
            let mut n = [0u8; 8];
            n.copy_from_slice(bytes);
            Ok((u64::from_le_bytes(n), 9))
        }
        0xFE => {
            let bytes = buf
                .get(1..5)
                .ok_or(CodecError::Truncated("varint"))?;
            let mut n = [0u8; 4];
            n.copy_from_slice(bytes);
            Ok((u32::from_le_bytes(n) as u64, 5))
        }
        0xFD => {
            let bytes = buf
                .get(1..3)
                .ok_or(CodecError::Truncated("varint"))?;
            let mut n = [0u8; 2];
            n.copy_from_slice(bytes);
            Ok((u16::from_le_bytes(n) as u64, 3))
        }
        small => Ok((small as u64, 1)),
    }
}

/// Append the varint encoding of `n` to `out`.
pub fn write_varint(n: u64, out: &mut Vec<u8>) {
    if n < 0xFD {
        out.push(n as u8);
    } else if n <= u16::MAX as u64 {
        out.push(0xFD);
        out.extend_from_slice(&(n as u16).to_le_bytes());
    } else if n <= u32::MAX as u64 {
        out.push(0xFE);
        out.extend_from_slice(&(n as u32).to_le_bytes());
    } else {
        out.push(0xFF);
        out.extend_from_slice(&n.to_le_bytes());
    }
}

/// Number of bytes the shortest-form encoding of `n` would occupy.
pub fn varint_len(n: u64) -> usize {
    if n < 0xFD {
        1
    } else if n <= u16::MAX as u64 {
        3
    } else if n <= u32::MAX as u64 {
        5
    } else {
        9
    }
}

/// Read a length-prefixed byte string (varint count + that many bytes).
pub fn read_varstring(buf: &[u8]) -> Result<(Vec<u8>, usize), CodecError> {
    let (len, prefix) = read_varint(buf)?;
    let len = len as usize;
    let end = prefix.checked_add(len).ok_or(CodecError::Truncated("varstring"))?;
    let bytes = buf.get(prefix..end).ok_or(CodecError::Truncated("varstring"))?;
    Ok((bytes.to_vec(), end))
}

/// Append a length-prefixed byte string.
pub fn write_varstring(s: &[u8], out: &mut Vec<u8>) {
    write_varint(s.len() as u64, out);
    out.extend_from_slice(s);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_tiers() {
        for n in [0u64, 1, 0xFC, 0xFD, 0xFFFF, 0x1_0000, u32::MAX as u64, u32::MAX as u64 + 1, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(n, &mut buf);
            let (decoded, used) = read_varint(&buf).unwrap();
            assert_eq!(decoded, n);
            assert_eq!(used, buf.len());
            assert_eq!(used, varint_len(n));
        }
    }

    #[test]
    fn accepts_non_minimal_encodings() {
        // 1 encoded via the 0xFD (u16) tier instead of the 1-byte tier.
        let buf = [0xFDu8, 0x01, 0x00];
        let (n, used) = read_varint(&buf).unwrap();
        assert_eq!(n, 1);
        assert_eq!(used, 3);
    }

    #[test]
    fn truncated_varint_is_an_error() {
        let buf = [0xFEu8, 0x01, 0x00];
        assert!(read_varint(&buf).is_err());
    }

    #[test]
    fn varstring_round_trip() {
        let mut out = Vec::new();
        write_varstring(b"/raven:0.1.0/", &mut out);
        let (s, used) = read_varstring(&out).unwrap();
        assert_eq!(s, b"/raven:0.1.0/");
        assert_eq!(used, out.len());
    }

    #[test]
    fn varstring_with_max_declared_length_does_not_panic() {
        let mut out = Vec::new();
        write_varint(u64::MAX, &mut out);
        out.extend_from_slice(b"short");
        assert!(read_varstring(&out).is_err());
    }
}
