//! Error taxonomy for the wire codec and handshake/status exchange.

use std::io;
use thiserror::Error;

/// Failure modes the protocol engine can observe while probing a single
/// target. Transient network failures live alongside this type at the
/// caller (the connection worker distinguishes `io::Error` kinds before
/// ever constructing a `ProtocolError`); everything here is a malformed or
/// unexpected wire-level condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("varint exceeded 5 bytes without a terminator")]
    Overflow,

    #[error("stream ended before a complete value could be read")]
    Truncated,

    #[error("string length prefix of {0} bytes exceeds the safety cap")]
    StringTooLong(usize),

    #[error("packet framing did not match the expected shape: {0}")]
    BadFrame(String),

    #[error("status document was not valid JSON: {0}")]
    BadJson(String),

    #[error("expected packet id {expected}, got {actual}")]
    UnexpectedPacketId { expected: i32, actual: i32 },

    #[error("peer greeted with a TLS handshake instead of the Minecraft protocol")]
    TlsUnexpected,

    #[error("legacy ping response was malformed: {0}")]
    BadLegacyFrame(String),

    #[error("server document is missing a mandatory field: {0}")]
    MissingField(&'static str),
}

impl From<ProtocolError> for io::Error {
    fn from(err: ProtocolError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
