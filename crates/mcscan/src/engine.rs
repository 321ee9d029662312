//! Drives a single probe end to end: connect, modern handshake/status
//! exchange, legacy fallback, retry policy, and multi-protocol attempts
//! (§4.2).

use std::time::{Duration, Instant};

use mcscan_protocol::document::ServerDocument;
use mcscan_protocol::handshake::NextState;
use mcscan_protocol::legacy::decode_legacy_kick;
use mcscan_protocol::status::read_status_response_seeded;
use mcscan_protocol::ProtocolError;
use socket2::{Socket, TcpKeepalive};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use mcscan_config::LogType;

use crate::result::{ProbeOutcome, Target};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub timeout: Duration,
    pub retries: u32,
    pub protocol_ids: Vec<i32>,
    pub legacy_support: bool,
    pub tcp_nodelay: bool,
    pub socket_keepalive: bool,
}

/// Runs the full probe against `target`, trying each configured protocol id
/// in turn (§4.2's multi-protocol mode), each with its own retry budget on
/// `Timeout`/`Reset` only.
pub async fn probe(target: &Target, cfg: &EngineConfig) -> ProbeOutcome {
    let mut last = ProbeOutcome::Unreachable;

    for &protocol_id in &cfg.protocol_ids {
        for attempt in 0..=cfg.retries {
            let outcome = tokio::time::timeout(cfg.timeout, attempt_once(target, protocol_id, cfg))
                .await
                .unwrap_or(ProbeOutcome::Timeout);

            let retryable = matches!(outcome, ProbeOutcome::Timeout | ProbeOutcome::Reset);
            if !retryable || attempt == cfg.retries {
                if matches!(outcome, ProbeOutcome::Success(..) | ProbeOutcome::LegacyDetected(..)) {
                    return outcome;
                }
                last = outcome;
                break;
            }
            debug!(
                log_type = LogType::ProtocolEngine.as_str(),
                addr = %target.addr,
                attempt,
                "retrying probe after transient failure"
            );
        }
    }

    last
}

async fn attempt_once(target: &Target, protocol_id: i32, cfg: &EngineConfig) -> ProbeOutcome {
    let mut stream = match connect(target, cfg).await {
        Ok(stream) => stream,
        Err(outcome) => return outcome,
    };

    let address = target.handshake_address();

    // Latency is the elapsed time between sending the Status Request and
    // receiving the first byte of the response (§4.2), not a separate ping
    // round-trip after the full body has already been read.
    let started = Instant::now();

    if let Err(e) = write_modern_handshake(&mut stream, protocol_id, &address, target.port).await {
        return classify_io_error(e);
    }

    let first_byte = match stream.read_u8().await {
        Ok(byte) => byte,
        Err(e) => return classify_io_error(e),
    };
    let latency = started.elapsed();

    if first_byte == 0xFF {
        return legacy_fallback(&mut stream, cfg.legacy_support).await;
    }

    match read_status_response_seeded(&mut stream, Some(first_byte)).await {
        Ok(json) => finish_modern(&json, latency),
        Err(ProtocolError::Truncated) => ProbeOutcome::Reset,
        Err(e) => ProbeOutcome::ProtocolError(e),
    }
}

async fn write_modern_handshake(
    stream: &mut TcpStream,
    protocol_id: i32,
    address: &str,
    port: u16,
) -> std::io::Result<()> {
    use mcscan_protocol::handshake::{build_handshake, build_status_request};

    let handshake = build_handshake(protocol_id, address, port, NextState::Status);
    let request = build_status_request();
    stream.write_all(&handshake).await?;
    stream.write_all(&request).await?;
    Ok(())
}

fn finish_modern(json: &str, latency: Duration) -> ProbeOutcome {
    let document = match ServerDocument::parse(json) {
        Ok(doc) => doc,
        Err(e) => return ProbeOutcome::ProtocolError(e),
    };

    ProbeOutcome::Success(Box::new(document), latency, json.to_string())
}

/// The peer's very first response byte was `0xFF` — a legacy kick packet
/// sent in answer to our (unrecognized) modern handshake bytes. The rest of
/// the kick body follows immediately on the same connection: a big-endian
/// `u16` character count, then that many UCS-2BE characters.
async fn legacy_fallback(stream: &mut TcpStream, legacy_support: bool) -> ProbeOutcome {
    if !legacy_support {
        return ProbeOutcome::ProtocolError(ProtocolError::BadLegacyFrame(
            "legacy responder detected but legacy_support is disabled".into(),
        ));
    }

    let mut len_bytes = [0u8; 2];
    if let Err(e) = stream.read_exact(&mut len_bytes).await {
        return classify_io_error(e);
    }
    let char_count = u16::from_be_bytes(len_bytes) as usize;

    let mut chars = vec![0u8; char_count * 2];
    if let Err(e) = stream.read_exact(&mut chars).await {
        return classify_io_error(e);
    }

    let mut body = Vec::with_capacity(3 + chars.len());
    body.push(0xFF);
    body.extend_from_slice(&len_bytes);
    body.extend_from_slice(&chars);

    match decode_legacy_kick(&body) {
        Ok(status) => ProbeOutcome::LegacyDetected(Box::new(status)),
        Err(e) => ProbeOutcome::ProtocolError(e),
    }
}

async fn connect(target: &Target, cfg: &EngineConfig) -> Result<TcpStream, ProbeOutcome> {
    let stream = TcpStream::connect((target.addr, target.port))
        .await
        .map_err(classify_io_error)?;

    if cfg.tcp_nodelay {
        let _ = stream.set_nodelay(true);
    }
    if cfg.socket_keepalive {
        apply_keepalive(&stream);
    }

    Ok(stream)
}

fn apply_keepalive(stream: &TcpStream) {
    use std::os::fd::AsRawFd;
    let socket = unsafe { Socket::from_raw_fd(stream.as_raw_fd()) };
    let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(60));
    let _ = socket.set_tcp_keepalive(&keepalive);
    std::mem::forget(socket);
}

fn classify_io_error(e: std::io::Error) -> ProbeOutcome {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::TimedOut => ProbeOutcome::Timeout,
        ErrorKind::ConnectionRefused => ProbeOutcome::Refused,
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::UnexpectedEof => {
            ProbeOutcome::Reset
        }
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable | ErrorKind::AddrNotAvailable => {
            ProbeOutcome::Unreachable
        }
        _ => ProbeOutcome::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener;

    fn cfg() -> EngineConfig {
        EngineConfig {
            timeout: Duration::from_secs(2),
            retries: 1,
            protocol_ids: vec![765],
            legacy_support: true,
            tcp_nodelay: true,
            socket_keepalive: false,
        }
    }

    #[tokio::test]
    async fn connects_and_parses_a_modern_status_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            use mcscan_protocol::types::{ProtocolWrite, VarInt};
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut discard = [0u8; 256];
            let _ = socket.read(&mut discard).await;

            let json = r#"{"version":{"name":"1.21","protocol":767},"players":{"max":20,"online":0}}"#;
            let mut body = Vec::new();
            VarInt(0x00).write_to(&mut body).unwrap();
            VarInt(json.len() as i32).write_to(&mut body).unwrap();
            body.extend_from_slice(json.as_bytes());
            let mut framed = Vec::new();
            VarInt(body.len() as i32).write_to(&mut framed).unwrap();
            framed.extend_from_slice(&body);
            socket.write_all(&framed).await.unwrap();
        });

        let target = Target::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), addr.port());
        let outcome = probe(&target, &cfg()).await;
        match outcome {
            ProbeOutcome::Success(doc, _, raw_json) => {
                assert_eq!(doc.version.protocol, 767);
                assert!(raw_json.contains("\"protocol\":767"));
            }
            other => panic!("expected Success, got {other:?}"),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_not_retried() {
        // Port 0 connect attempts fail immediately with refused/invalid-input
        // on loopback without binding anything.
        let target = Target::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1);
        let outcome = probe(&target, &cfg()).await;
        assert!(matches!(
            outcome,
            ProbeOutcome::Refused | ProbeOutcome::Unreachable | ProbeOutcome::Timeout
        ));
    }
}
