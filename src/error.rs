//! Error taxonomy, per the framing/protocol/policy/socket split in the design.

use std::fmt;
use std::io;

use thiserror::Error;

/// Coarse classification of a disconnect, handed to the `disconnected` hook.
///
/// Mirrors the handful of `errno` values the reference implementation surfaces:
/// malformed/invalid input becomes `Proto`, a caller-set or built-in deadline
/// becomes `Timeout`, and a socket torn down from the outside becomes `ConnReset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// `EPROTO`: a framing or protocol violation.
    Proto,
    /// `ETIMEDOUT`: a deadline (connect, message, caller-scheduled) elapsed.
    Timeout,
    /// `ECONNRESET`: the underlying socket was reset or closed by the peer.
    ConnReset,
    /// Any other OS-level socket error, preserved verbatim.
    Other(i32),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proto => write!(f, "EPROTO"),
            Self::Timeout => write!(f, "ETIMEDOUT"),
            Self::ConnReset => write!(f, "ECONNRESET"),
            Self::Other(errno) => write!(f, "errno {errno}"),
        }
    }
}

/// Errors produced while decoding the wire envelope or a message payload.
///
/// All variants here are fatal: the caller must tear down the connection with
/// [`ErrorCode::Proto`] on any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The command name's 12th byte was not NUL.
    #[error("malformed command name")]
    MalformedCommand,
    /// The declared payload length exceeds `MAX_MSG_LENGTH`.
    #[error("payload length {0} exceeds maximum")]
    PayloadTooLarge(u32),
    /// The computed double-SHA256 checksum did not match the header.
    #[error("checksum mismatch")]
    BadChecksum,
    /// A varint or fixed-width field ran past the end of the buffer.
    #[error("unexpected end of buffer while decoding {0}")]
    Truncated(&'static str),
    /// A collection count exceeded a hard (fatal) protocol limit.
    #[error("{0} count {1} exceeds protocol limit")]
    CountExceeded(&'static str, usize),
    /// A field had a value that isn't valid on its own terms (bad enum tag, etc).
    #[error("invalid {0}")]
    InvalidField(&'static str),
}

impl CodecError {
    /// All codec errors are framing/protocol violations.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Proto
    }
}

/// A violation of the peer's message-ordering or state-machine rules.
///
/// Distinct from [`CodecError`] in that the bytes decoded fine, but receiving
/// them at this point in the conversation is itself illegal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A message type requires a precondition (filter/getdata/mempool sent) that
    /// wasn't met, e.g. an unsolicited `tx` or `merkleblock`.
    #[error("{0}")]
    OutOfOrder(&'static str),
    /// A `pong` arrived with no matching outstanding `ping`.
    #[error("unexpected pong")]
    UnexpectedPong,
    /// An announced block count implies the peer is lying about its height.
    #[error("non-standard inv")]
    NonStandardInv,
    /// A header or merkle block failed verification.
    #[error("invalid header or block")]
    InvalidBlock,
}

impl ProtocolError {
    /// All protocol errors are, like codec errors, `EPROTO` disconnects.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Proto
    }
}

/// Top-level error type for anything that can go wrong on a peer connection.
#[derive(Error, Debug)]
pub enum PeerError {
    /// Framing-layer failure (bad header, checksum, oversized payload).
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Message arrived fine but broke a state-machine invariant.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// A deadline (connect, message, or caller-scheduled) elapsed.
    #[error("timed out: {0}")]
    Timeout(&'static str),
    /// The underlying socket failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PeerError {
    /// Classify this error the way the `disconnected` hook expects.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Codec(e) => e.code(),
            Self::Protocol(e) => e.code(),
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::Io(e) => match e.kind() {
                io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof => {
                    ErrorCode::ConnReset
                }
                io::ErrorKind::TimedOut => ErrorCode::Timeout,
                _ => ErrorCode::Other(e.raw_os_error().unwrap_or(-1)),
            },
        }
    }
}
