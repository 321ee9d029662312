//! Packet construction for the modern (1.7+) handshake and status request.
//!
//! These are pure functions over byte buffers — no I/O — so the engine can
//! build a probe's outgoing bytes once and reuse them across retries.

use crate::types::{ProtocolRead, ProtocolWrite, UnsignedShort, VarInt, VarString, WriteToBytes};
use bytes::{BufMut, BytesMut};

/// `next_state` field of the handshake packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status,
    Login,
}

impl NextState {
    fn as_varint(self) -> VarInt {
        match self {
            NextState::Status => VarInt(1),
            NextState::Login => VarInt(2),
        }
    }
}

/// Builds a complete, length-prefixed handshake packet (packet id `0x00`)
/// addressed to `server_address:server_port`, announcing `protocol_version`
/// and requesting `next_state`.
pub fn build_handshake(
    protocol_version: i32,
    server_address: &str,
    server_port: u16,
    next_state: NextState,
) -> BytesMut {
    let mut body = BytesMut::new();
    VarInt(0x00).write_to_bytes(&mut body).expect("packet id fits in 3 bytes");
    VarInt(protocol_version)
        .write_to_bytes(&mut body)
        .expect("protocol version fits in 3 bytes");
    VarString::new(server_address)
        .write_to_bytes(&mut body)
        .expect("hostname under safety cap");
    UnsignedShort(server_port)
        .write_to(&mut body.writer())
        .expect("write to BytesMut never fails");
    next_state
        .as_varint()
        .write_to_bytes(&mut body)
        .expect("next_state fits in 3 bytes");

    frame(body)
}

/// Builds the status request packet (packet id `0x00`, empty body).
pub fn build_status_request() -> BytesMut {
    let mut body = BytesMut::new();
    VarInt(0x00).write_to_bytes(&mut body).expect("packet id fits in 3 bytes");
    frame(body)
}

/// Builds a ping packet (packet id `0x01`) carrying an opaque payload that
/// the server is required to echo back verbatim, used for round-trip-time
/// measurement after the status response has been read.
pub fn build_ping_request(payload: i64) -> BytesMut {
    let mut body = BytesMut::new();
    VarInt(0x01).write_to_bytes(&mut body).expect("packet id fits in 3 bytes");
    body.extend_from_slice(&payload.to_be_bytes());
    frame(body)
}

fn frame(body: BytesMut) -> BytesMut {
    let len = VarInt(body.len() as i32);
    let mut framed = BytesMut::with_capacity(5 + body.len());
    len.write_to_bytes(&mut framed).expect("frame length fits in 3 bytes for any realistic packet");
    framed.extend_from_slice(&body);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_is_length_prefixed() {
        let packet = build_handshake(765, "play.example.net", 25565, NextState::Status);
        let (len, prefix_len) = VarInt::read_from(&mut packet.as_ref()).unwrap();
        assert_eq!(len.0 as usize, packet.len() - prefix_len);
    }

    #[test]
    fn status_request_is_two_bytes() {
        let packet = build_status_request();
        assert_eq!(packet.as_ref(), &[0x01, 0x00]);
    }

    #[test]
    fn ping_request_carries_payload() {
        let packet = build_ping_request(42);
        assert_eq!(packet.len(), 1 /* len */ + 1 /* id */ + 8 /* i64 */);
    }
}
