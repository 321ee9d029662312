//! Async helpers that drive a full handshake → status request → status
//! response exchange over a live socket.
//!
//! These are thin: they own framing and byte plumbing only. Timeout and
//! retry policy belong to the caller, which is why every function here
//! takes an already-connected stream rather than a host/port pair.

use crate::error::{ProtocolError, Result as ProtoResult};
use crate::handshake::{build_handshake, build_status_request, NextState};
use crate::types::VarInt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum accepted status response body, guarding against a peer that
/// claims an enormous frame length and then never stops sending.
const MAX_RESPONSE_BYTES: usize = 1 << 20; // 1 MiB

/// Performs the handshake + status request and returns the raw JSON body of
/// the status response.
pub async fn fetch_status_json<S>(
    stream: &mut S,
    protocol_version: i32,
    server_address: &str,
    server_port: u16,
) -> ProtoResult<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handshake = build_handshake(protocol_version, server_address, server_port, NextState::Status);
    let request = build_status_request();

    stream
        .write_all(&handshake)
        .await
        .map_err(|e| ProtocolError::BadFrame(e.to_string()))?;
    stream
        .write_all(&request)
        .await
        .map_err(|e| ProtocolError::BadFrame(e.to_string()))?;

    read_status_response(stream).await
}

async fn read_frame_from<S>(
    stream: &mut S,
    expected_packet_id: i32,
    first_byte: Option<u8>,
) -> ProtoResult<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let frame_len = read_varint_async_from(stream, first_byte).await?;
    if frame_len < 0 || frame_len as usize > MAX_RESPONSE_BYTES {
        return Err(ProtocolError::BadFrame(format!(
            "implausible frame length {frame_len}"
        )));
    }

    let mut frame = vec![0u8; frame_len as usize];
    stream
        .read_exact(&mut frame)
        .await
        .map_err(|_| ProtocolError::Truncated)?;

    let mut cursor = &frame[..];
    let packet_id = read_varint_sync_consuming(&mut cursor)?;
    if packet_id != expected_packet_id {
        return Err(ProtocolError::UnexpectedPacketId {
            expected: expected_packet_id,
            actual: packet_id,
        });
    }

    Ok(cursor.to_vec())
}

/// Decodes a VarInt off an async stream. The first byte may already have
/// been read off the stream by the caller (e.g. while probing for the
/// legacy `0xFF` marker) and is supplied here instead of re-read.
async fn read_varint_async_from<S>(stream: &mut S, first_byte: Option<u8>) -> ProtoResult<i32>
where
    S: AsyncRead + Unpin,
{
    let mut value: i32 = 0;
    let mut position = 0;
    let mut bytes_read = 0;
    let mut pending = first_byte;

    loop {
        if bytes_read >= 5 {
            return Err(ProtocolError::Overflow);
        }
        let byte = match pending.take() {
            Some(b) => b,
            None => stream.read_u8().await.map_err(|_| ProtocolError::Truncated)?,
        };
        bytes_read += 1;

        value |= ((byte & 0x7f) as i32) << position;
        if byte & 0x80 == 0 {
            break;
        }
        position += 7;
        if position >= 32 {
            return Err(ProtocolError::Overflow);
        }
    }

    Ok(value)
}

/// Reads the status response body (a `VarString`-prefixed JSON payload) as a
/// UTF-8 string.
pub async fn read_status_response<S>(stream: &mut S) -> ProtoResult<String>
where
    S: AsyncRead + Unpin,
{
    read_status_response_seeded(stream, None).await
}

/// As [`read_status_response`], but the caller has already consumed one byte
/// off the stream (typically while peeking for the legacy `0xFF` marker) and
/// supplies it here instead of losing it.
pub async fn read_status_response_seeded<S>(
    stream: &mut S,
    first_byte: Option<u8>,
) -> ProtoResult<String>
where
    S: AsyncRead + Unpin,
{
    let body = read_frame_from(stream, 0x00, first_byte).await?;
    let mut cursor = &body[..];
    let json_len = read_varint_sync_consuming(&mut cursor)?;
    if json_len < 0 || json_len as usize > cursor.len() {
        return Err(ProtocolError::BadFrame("status json length mismatch".into()));
    }
    String::from_utf8(cursor[..json_len as usize].to_vec())
        .map_err(|e| ProtocolError::BadJson(e.to_string()))
}

fn read_varint_sync_consuming(cursor: &mut &[u8]) -> ProtoResult<i32> {
    use crate::types::ProtocolRead;
    let (varint, consumed) = VarInt::read_from(cursor).map_err(|_| ProtocolError::Truncated)?;
    *cursor = &cursor[consumed..];
    Ok(varint.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn reads_status_response_from_loopback_pair() {
        let (mut client, mut server) = duplex(4096);

        // Server side: drain the handshake + request, reply with a status doc.
        let responder = tokio::spawn(async move {
            let mut discard = [0u8; 64];
            let _ = server.read(&mut discard).await;
            use crate::types::ProtocolWrite;
            let json = r#"{"version":{"name":"1.20.4","protocol":765},"players":{"max":20,"online":0}}"#;
            let mut body = Vec::new();
            crate::types::VarInt(0x00)
                .write_to(&mut body)
                .unwrap();
            crate::types::VarInt(json.len() as i32)
                .write_to(&mut body)
                .unwrap();
            body.extend_from_slice(json.as_bytes());
            let mut framed = Vec::new();
            crate::types::VarInt(body.len() as i32)
                .write_to(&mut framed)
                .unwrap();
            framed.extend_from_slice(&body);
            server.write_all(&framed).await.unwrap();
        });

        let handshake = build_handshake(765, "localhost", 25565, NextState::Status);
        let request = build_status_request();
        client.write_all(&handshake).await.unwrap();
        client.write_all(&request).await.unwrap();

        let json = read_status_response(&mut client).await.unwrap();
        assert!(json.contains("\"protocol\":765"));

        responder.await.unwrap();
    }

    #[tokio::test]
    async fn seeded_read_recovers_a_byte_peeked_off_the_stream() {
        let (mut client, mut server) = duplex(4096);

        let responder = tokio::spawn(async move {
            use crate::types::ProtocolWrite;
            let json = r#"{"version":{"name":"1.20.4","protocol":765},"players":{"max":20,"online":0}}"#;
            let mut body = Vec::new();
            crate::types::VarInt(0x00).write_to(&mut body).unwrap();
            crate::types::VarInt(json.len() as i32).write_to(&mut body).unwrap();
            body.extend_from_slice(json.as_bytes());
            let mut framed = Vec::new();
            crate::types::VarInt(body.len() as i32).write_to(&mut framed).unwrap();
            framed.extend_from_slice(&body);
            server.write_all(&framed).await.unwrap();
        });

        let first_byte = client.read_u8().await.unwrap();
        let json = read_status_response_seeded(&mut client, Some(first_byte)).await.unwrap();
        assert!(json.contains("\"protocol\":765"));

        responder.await.unwrap();
    }
}
