//! BIP61 `reject`.

use crate::error::CodecError;
use crate::varint::{read_varstring, write_varstring};

/// A decoded `reject` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectMessage {
    /// Name of the command that was rejected.
    pub message: String,
    /// BIP61 reject code.
    pub code: u8,
    /// Human-readable reason.
    pub reason: String,
    /// The rejected transaction's hash, present iff `message == "tx"`.
    pub tx_hash: Option<[u8; 32]>,
}

impl RejectMessage {
    /// Decode a `reject` payload.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let (message_bytes, mut offset) = read_varstring(buf)?;
        let message = String::from_utf8_lossy(&message_bytes).into_owned();
        let code = *buf.get(offset).ok_or(CodecError::Truncated("reject"))?;
        offset += 1;
        let (reason_bytes, used) = read_varstring(&buf[offset..])?;
        let reason = String::from_utf8_lossy(&reason_bytes).into_owned();
        offset += used;

        let tx_hash = if message == "tx" {
            let hash = buf.get(offset..offset + 32).ok_or(CodecError::Truncated("reject"))?;
            let mut h = [0u8; 32];
            h.copy_from_slice(hash);
            Some(h)
        } else {
            None
        };

        Ok(Self { message, code, reason, tx_hash })
    }

    /// Encode a `reject` payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_varstring(self.message.as_bytes(), &mut out);
        out.push(self.code);
        write_varstring(self.reason.as_bytes(), &mut out);
        if let Some(hash) = self.tx_hash {
            out.extend_from_slice(&hash);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_with_tx_hash() {
        let msg = RejectMessage {
            message: "tx".to_string(),
            code: 0x40,
            reason: "dust".to_string(),
            tx_hash: Some([7; 32]),
        };
        let encoded = msg.encode();
        assert_eq!(RejectMessage::decode(&encoded).unwrap(), msg);
    }

    #[test]
    fn round_trip_without_tx_hash() {
        let msg = RejectMessage {
            message: "version".to_string(),
            code: 0x01,
            reason: "obsolete".to_string(),
            tx_hash: None,
        };
        let encoded = msg.encode();
        assert_eq!(RejectMessage::decode(&encoded).unwrap(), msg);
    }
}
