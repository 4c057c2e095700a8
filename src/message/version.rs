//! The `version` handshake message.

use crate::error::CodecError;
use crate::message::address::NetAddress;
use crate::varint::{read_varstring, write_varstring};

/// Minimum byte length of a well-formed `version` payload (up to and
/// including a zero-length user agent and the trailing fixed fields).
pub const MIN_VERSION_PAYLOAD_LEN: usize = 85;

/// A decoded `version` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    /// Sender's protocol version.
    pub version: u32,
    /// Sender's services bitmask.
    pub services: u64,
    /// Sender's wall-clock time.
    pub timestamp: u64,
    /// Address of the recipient, as seen by the sender.
    pub recv_addr: NetAddress,
    /// Address of the sender, as seen by itself.
    pub from_addr: NetAddress,
    /// Random nonce, used to detect self-connections.
    pub nonce: u64,
    /// Free-form user agent string.
    pub user_agent: String,
    /// Sender's best known block height.
    pub start_height: u32,
    /// Whether the sender wants unfiltered `inv` relay.
    pub relay: bool,
}

impl VersionMessage {
    /// Decode a `version` payload.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < MIN_VERSION_PAYLOAD_LEN {
            return Err(CodecError::Truncated("version"));
        }
        let version = read_u32(buf, 0)?;
        let services = read_u64(buf, 4)?;
        let timestamp = read_u64(buf, 12)?;
        let (recv_addr, _) = NetAddress::read_untimestamped(&buf[20..])?;
        let (from_addr, _) = NetAddress::read_untimestamped(&buf[46..])?;
        let nonce = read_u64(buf, 72)?;
        let (ua_bytes, used) = read_varstring(&buf[80..])?;
        let user_agent = String::from_utf8_lossy(&ua_bytes).into_owned();
        let tail = 80 + used;
        let start_height = read_u32(buf, tail)?;
        let relay = buf.get(tail + 4).copied().unwrap_or(1) != 0;
        Ok(Self {
            version,
            services,
            timestamp,
            recv_addr,
            from_addr,
            nonce,
            user_agent,
            start_height,
            relay,
        })
    }

    /// Encode this message to its wire payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MIN_VERSION_PAYLOAD_LEN + self.user_agent.len());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.services.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        self.recv_addr.write_untimestamped(&mut out);
        self.from_addr.write_untimestamped(&mut out);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        write_varstring(self.user_agent.as_bytes(), &mut out);
        out.extend_from_slice(&self.start_height.to_le_bytes());
        out.push(self.relay as u8);
        out
    }
}

fn read_u32(buf: &[u8], at: usize) -> Result<u32, CodecError> {
    let b = buf.get(at..at + 4).ok_or(CodecError::Truncated("version"))?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64(buf: &[u8], at: usize) -> Result<u64, CodecError> {
    let b = buf.get(at..at + 8).ok_or(CodecError::Truncated("version"))?;
    let mut n = [0u8; 8];
    n.copy_from_slice(b);
    Ok(u64::from_le_bytes(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VersionMessage {
        VersionMessage {
            version: 70027,
            services: 0,
            timestamp: 1_700_000_000,
            recv_addr: NetAddress { time: None, services: 0, ip: [0; 16], port: 8767 },
            from_addr: NetAddress {
                time: None,
                services: 0,
                ip: crate::constants::LOCAL_HOST,
                port: 8767,
            },
            nonce: 0xdead_beef_cafe_babe,
            user_agent: "/raven:0.1.0/".to_string(),
            start_height: 42,
            relay: true,
        }
    }

    #[test]
    fn round_trip() {
        let msg = sample();
        let encoded = msg.encode();
        assert!(encoded.len() >= MIN_VERSION_PAYLOAD_LEN);
        let decoded = VersionMessage::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn rejects_payload_shorter_than_minimum() {
        let short = vec![0u8; MIN_VERSION_PAYLOAD_LEN - 1];
        assert!(VersionMessage::decode(&short).is_err());
    }
}
