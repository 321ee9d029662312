//! The two pre-netty (pre-1.7) server list ping variants.
//!
//! Both speak in terms of a single `0xFF` "kick" packet whose body is a
//! `UnsignedShort`-prefixed, UCS-2BE (big-endian UTF-16) string. What that
//! string contains is what distinguishes the two sub-variants:
//!
//! - **Beta/1.3 and earlier**: the field is the MOTD and online/max player
//!   counts joined by `§` (U+00A7), with no leading marker.
//! - **1.4–1.6**: the string begins with the literal two-character marker
//!   `§1`, followed by NUL-separated protocol version, server version
//!   string, MOTD, online count, and max count.

use crate::error::{ProtocolError, Result};

const SECTION_SIGN: char = '\u{00A7}';
const KICK_PACKET_ID: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyStatus {
    pub motd: String,
    pub online_players: i64,
    pub max_players: i64,
    /// Present only on the 1.4–1.6 sub-variant, which is the only one that
    /// carries a protocol version and version string.
    pub protocol_version: Option<i64>,
    pub version_name: Option<String>,
}

/// The beta/pre-1.4 ping is a single `0xFE` byte with nothing else.
pub fn build_beta_ping() -> Vec<u8> {
    vec![0xFE]
}

/// The 1.4–1.6 ping adds a `0x01` payload byte plus a plugin message
/// (`0xFA "MC|PingHost"`) carrying the target hostname and port, which lets
/// virtual-host-aware servers answer with the right MOTD.
pub fn build_modern_legacy_ping(server_address: &str, server_port: u16) -> Vec<u8> {
    let mut out = vec![0xFEu8, 0x01, 0xFA];

    let channel = "MC|PingHost";
    out.extend_from_slice(&(channel.len() as u16).to_be_bytes());
    out.extend(channel.encode_utf16().flat_map(|u| u.to_be_bytes()));

    let host_utf16: Vec<u16> = server_address.encode_utf16().collect();
    // protocol version (1 byte, best-effort — servers largely ignore it for
    // ping purposes) + host length (short) + host (UCS-2BE) + port (int)
    let payload_len = 1 + 2 + host_utf16.len() * 2 + 4;
    out.extend_from_slice(&(payload_len as u16).to_be_bytes());
    out.push(0x4E); // arbitrary protocol version byte, matches common probes
    out.extend_from_slice(&(host_utf16.len() as u16).to_be_bytes());
    out.extend(host_utf16.iter().flat_map(|u| u.to_be_bytes()));
    out.extend_from_slice(&(server_port as i32).to_be_bytes());

    out
}

/// Decodes a `0xFF` kick packet body into a [`LegacyStatus`].
///
/// `bytes` must start at the packet id byte.
pub fn decode_legacy_kick(bytes: &[u8]) -> Result<LegacyStatus> {
    if bytes.first() != Some(&KICK_PACKET_ID) {
        return Err(ProtocolError::BadLegacyFrame(
            "expected a 0xFF kick packet".into(),
        ));
    }
    if bytes.len() < 3 {
        return Err(ProtocolError::Truncated);
    }

    let str_len = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
    let char_bytes = &bytes[3..];
    if char_bytes.len() < str_len * 2 {
        return Err(ProtocolError::Truncated);
    }

    let units: Vec<u16> = char_bytes[..str_len * 2]
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16(&units)
        .map_err(|e| ProtocolError::BadLegacyFrame(e.to_string()))?;

    parse_kick_text(&text)
}

fn parse_kick_text(text: &str) -> Result<LegacyStatus> {
    if let Some(rest) = text.strip_prefix(&format!("{SECTION_SIGN}1")) {
        let fields: Vec<&str> = rest.split('\0').collect();
        let fields = if fields.first() == Some(&"") { &fields[1..] } else { &fields[..] };
        if fields.len() < 5 {
            return Err(ProtocolError::BadLegacyFrame(
                "expected 5 NUL-separated fields in the §1 variant".into(),
            ));
        }
        let protocol_version = fields[0]
            .parse::<i64>()
            .map_err(|_| ProtocolError::BadLegacyFrame("non-numeric protocol version".into()))?;
        let online_players = fields[3]
            .parse::<i64>()
            .map_err(|_| ProtocolError::BadLegacyFrame("non-numeric online count".into()))?;
        let max_players = fields[4]
            .parse::<i64>()
            .map_err(|_| ProtocolError::BadLegacyFrame("non-numeric max count".into()))?;

        Ok(LegacyStatus {
            motd: fields[2].to_string(),
            online_players,
            max_players,
            protocol_version: Some(protocol_version),
            version_name: Some(fields[1].to_string()),
        })
    } else {
        let fields: Vec<&str> = text.split(SECTION_SIGN).collect();
        if fields.len() < 3 {
            return Err(ProtocolError::BadLegacyFrame(
                "expected 3 section-sign-separated fields in the beta variant".into(),
            ));
        }
        let online_players = fields[1]
            .parse::<i64>()
            .map_err(|_| ProtocolError::BadLegacyFrame("non-numeric online count".into()))?;
        let max_players = fields[2]
            .parse::<i64>()
            .map_err(|_| ProtocolError::BadLegacyFrame("non-numeric max count".into()))?;

        Ok(LegacyStatus {
            motd: fields[0].to_string(),
            online_players,
            max_players,
            protocol_version: None,
            version_name: None,
        })
    }
}

fn encode_kick_body(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut out = vec![KICK_PACKET_ID];
    out.extend_from_slice(&(units.len() as u16).to_be_bytes());
    out.extend(units.iter().flat_map(|u| u.to_be_bytes()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_beta_variant() {
        let text = format!("A Minecraft Server{SECTION_SIGN}4{SECTION_SIGN}20");
        let body = encode_kick_body(&text);
        let status = decode_legacy_kick(&body).unwrap();
        assert_eq!(status.motd, "A Minecraft Server");
        assert_eq!(status.online_players, 4);
        assert_eq!(status.max_players, 20);
        assert!(status.protocol_version.is_none());
    }

    #[test]
    fn decodes_modern_legacy_variant() {
        let text = format!("{SECTION_SIGN}1\091\01.9\0A Minecraft Server\05\020");
        let body = encode_kick_body(&text);
        let status = decode_legacy_kick(&body).unwrap();
        assert_eq!(status.protocol_version, Some(91));
        assert_eq!(status.version_name.as_deref(), Some("1.9"));
        assert_eq!(status.motd, "A Minecraft Server");
        assert_eq!(status.online_players, 5);
        assert_eq!(status.max_players, 20);
    }

    #[test]
    fn rejects_wrong_packet_id() {
        assert!(decode_legacy_kick(&[0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn rejects_truncated_body() {
        assert!(decode_legacy_kick(&[0xFF, 0x00, 0x05]).is_err());
    }

    #[test]
    fn modern_ping_bytes_start_with_marker() {
        let bytes = build_modern_legacy_ping("play.example.net", 25565);
        assert_eq!(&bytes[0..3], &[0xFE, 0x01, 0xFA]);
    }
}
