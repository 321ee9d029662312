//! Turns a parsed [`ServerDocument`] into the canonical [`ScanResult`]
//! fields: software classification, favicon hashing, mod dedup, and the
//! offline/online UUID heuristic.

use std::collections::HashSet;

use base64::Engine;
use mcscan_protocol::document::ServerDocument;
use md5::{Digest, Md5};
use sha2::Sha256;
use uuid::Uuid;

use crate::result::{ModRecord, OnlineModeGuess, PlayerSample, Software};

/// Ordered classification rules from §4.3: the first match wins.
pub fn classify_software(doc: &ServerDocument) -> Software {
    let name = doc.version.name.to_lowercase();
    let is_forge_data = doc.forge_data.is_some();
    let is_fml_modinfo = doc
        .forge_modinfo
        .as_ref()
        .is_some_and(|m| m.kind.eq_ignore_ascii_case("FML"));

    if is_forge_data || name.contains("forge") {
        Software::Forge
    } else if is_fml_modinfo {
        Software::Forge
    } else if name.contains("fabric") {
        Software::Fabric
    } else if name.contains("paper") {
        Software::Paper
    } else if name.contains("purpur") {
        Software::Purpur
    } else if name.contains("folia") {
        Software::Folia
    } else if name.contains("spigot") {
        Software::Spigot
    } else if name.contains("bukkit") {
        Software::Bukkit
    } else if name.contains("velocity") {
        Software::Velocity
    } else if name.contains("bungee") {
        Software::Bungeecord
    } else if is_vanilla_semver(&name) {
        Software::Vanilla
    } else {
        Software::Unknown
    }
}

fn is_vanilla_semver(name: &str) -> bool {
    // Vanilla version strings look like "1.20.4" or "1.8" with nothing else.
    !name.is_empty()
        && name
            .split('.')
            .all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()))
}

/// The offline-mode UUID Mojang's `UUID.nameUUIDFromBytes` derives for
/// `"OfflinePlayer:"+name`: MD5 of the bytes directly (no RFC 4122
/// namespace prefix), with the version/variant bits then forced to mark it
/// a v3 UUID.
pub fn offline_uuid_for(name: &str) -> Uuid {
    let digest = Md5::digest(format!("OfflinePlayer:{name}").as_bytes());
    let mut bytes: [u8; 16] = digest.into();
    bytes[6] = (bytes[6] & 0x0F) | 0x30;
    bytes[8] = (bytes[8] & 0x3F) | 0x80;
    Uuid::from_bytes(bytes)
}

/// Guesses whether the server is running in online mode by checking
/// whether sampled UUIDs look offline-derived (v3) or genuine Mojang
/// profile UUIDs (v4).
pub fn guess_online_mode(sample: &[PlayerSample]) -> OnlineModeGuess {
    if sample.is_empty() {
        return OnlineModeGuess::Unknown;
    }

    let mut any_offline = false;
    let mut any_online = false;

    for player in sample {
        let Ok(uuid) = Uuid::parse_str(&player.uuid) else {
            continue;
        };
        if uuid == offline_uuid_for(&player.name) {
            any_offline = true;
        } else if uuid.get_version_num() == 4 {
            any_online = true;
        }
    }

    match (any_offline, any_online) {
        (true, false) => OnlineModeGuess::LikelyOffline,
        (false, true) => OnlineModeGuess::LikelyOnline,
        _ => OnlineModeGuess::Unknown,
    }
}

pub struct Favicon {
    pub hash: String,
    pub bytes: Vec<u8>,
}

/// Decodes a `data:image/png;base64,<payload>` favicon field and hashes its
/// content with SHA-256.
pub fn decode_favicon(field: &str) -> Option<Favicon> {
    let payload = field.strip_prefix("data:image/png;base64,")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    let hash = hex::encode(Sha256::digest(&bytes));
    Some(Favicon { hash, bytes })
}

/// Deduplicates mods by `mod_id`, keeping the first-seen version.
pub fn dedup_mods(mods: impl IntoIterator<Item = ModRecord>) -> Vec<ModRecord> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for m in mods {
        if seen.insert(m.mod_id.clone()) {
            out.push(m);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> ServerDocument {
        serde_json::from_value(serde_json::json!({
            "version": {"name": name, "protocol": 765},
            "players": {"max": 20, "online": 0},
        }))
        .unwrap()
    }

    #[test]
    fn classifies_forge_by_forge_data() {
        let mut d = doc("1.20.1");
        d.forge_data = Some(serde_json::json!({"mods": []}));
        assert_eq!(classify_software(&d), Software::Forge);
    }

    #[test]
    fn classifies_paper_by_name() {
        assert_eq!(classify_software(&doc("Paper 1.20.1")), Software::Paper);
    }

    #[test]
    fn classifies_vanilla_semver() {
        assert_eq!(classify_software(&doc("1.21")), Software::Vanilla);
    }

    #[test]
    fn unrecognized_name_is_unknown() {
        assert_eq!(classify_software(&doc("MyCustomThing v2")), Software::Unknown);
    }

    #[test]
    fn offline_uuid_detected() {
        let name = "Notch";
        let sample = vec![PlayerSample {
            name: name.to_string(),
            uuid: offline_uuid_for(name).to_string(),
        }];
        assert_eq!(guess_online_mode(&sample), OnlineModeGuess::LikelyOffline);
    }

    #[test]
    fn online_v4_uuid_detected() {
        let sample = vec![PlayerSample {
            name: "Alice".to_string(),
            uuid: "a0000000-0000-4000-8000-000000000001".to_string(),
        }];
        assert_eq!(guess_online_mode(&sample), OnlineModeGuess::LikelyOnline);
    }

    #[test]
    fn empty_sample_is_unknown() {
        assert_eq!(guess_online_mode(&[]), OnlineModeGuess::Unknown);
    }

    #[test]
    fn dedup_keeps_first_seen_version() {
        let mods = vec![
            ModRecord { mod_id: "jei".to_string(), version: "15.2.0".to_string() },
            ModRecord { mod_id: "jei".to_string(), version: "16.0.0".to_string() },
        ];
        let deduped = dedup_mods(mods);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].version, "15.2.0");
    }

    #[test]
    fn decodes_and_hashes_favicon() {
        let png_bytes = b"\x89PNG\r\n\x1a\nrest-of-file";
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes);
        let field = format!("data:image/png;base64,{encoded}");
        let favicon = decode_favicon(&field).unwrap();
        assert_eq!(favicon.bytes, png_bytes);
        assert_eq!(favicon.hash.len(), 64);
    }
}
