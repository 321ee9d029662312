//! The JSON status document returned by the modern status response packet.
//!
//! Deserialization is intentionally permissive about vendor extensions
//! (unknown fields are ignored) but strict about the handful of fields the
//! scanner treats as load-bearing: `version.protocol` and `players.max` must
//! be present for a response to count as a successful probe.

use crate::error::{ProtocolError, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerDocument {
    pub version: VersionInfo,
    pub players: PlayersInfo,
    #[serde(default)]
    pub description: Option<Value>,
    pub favicon: Option<String>,
    #[serde(rename = "modinfo")]
    pub forge_modinfo: Option<ForgeModInfo>,
    #[serde(rename = "forgeData")]
    pub forge_data: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    pub name: String,
    pub protocol: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayersInfo {
    pub max: i64,
    pub online: i64,
    #[serde(default)]
    pub sample: Vec<PlayerSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSample {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgeModInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, rename = "modList")]
    pub mod_list: Vec<ForgeMod>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgeMod {
    pub modid: String,
    pub version: String,
}

impl ServerDocument {
    /// Parses and validates the mandatory shape of a status response body.
    pub fn parse(raw: &str) -> Result<Self> {
        let doc: ServerDocument =
            serde_json::from_str(raw).map_err(|e| ProtocolError::BadJson(e.to_string()))?;
        if doc.players.max < 0 {
            return Err(ProtocolError::MissingField("players.max"));
        }
        Ok(doc)
    }

    /// Flattens the `description` field — a bare string, a single chat
    /// component object, or an array of components — into plain text,
    /// discarding color/formatting codes.
    pub fn motd_plain(&self) -> String {
        match &self.description {
            Some(value) => strip_color_codes(&flatten_component(value)),
            None => String::new(),
        }
    }
}

fn flatten_component(value: &Value) -> String {
    let mut out = String::new();
    flatten_component_into(value, &mut out);
    out
}

/// Strips `§`-prefixed legacy color/formatting codes (`§a`, `§l`, ...) from
/// already-flattened MOTD text.
fn strip_color_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

fn flatten_component_into(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for item in items {
                flatten_component_into(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push_str(text);
            }
            if let Some(Value::String(translate)) = map.get("translate") {
                out.push_str(translate);
            }
            if let Some(extra) = map.get("extra") {
                flatten_component_into(extra, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let raw = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 3},
            "description": "A Minecraft Server"
        }"#;
        let doc = ServerDocument::parse(raw).unwrap();
        assert_eq!(doc.version.protocol, 765);
        assert_eq!(doc.motd_plain(), "A Minecraft Server");
    }

    #[test]
    fn flattens_chat_component_motd() {
        let raw = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 0},
            "description": {"text": "Welcome ", "extra": [{"text": "to the server"}]}
        }"#;
        let doc = ServerDocument::parse(raw).unwrap();
        assert_eq!(doc.motd_plain(), "Welcome to the server");
    }

    #[test]
    fn strips_color_codes_from_motd() {
        let raw = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 0},
            "description": "§aHello §bWorld"
        }"#;
        let doc = ServerDocument::parse(raw).unwrap();
        assert_eq!(doc.motd_plain(), "Hello World");
    }

    #[test]
    fn tolerates_unknown_fields() {
        let raw = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 0},
            "description": "hi",
            "someVendorField": {"nested": true}
        }"#;
        assert!(ServerDocument::parse(raw).is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ServerDocument::parse("not json").is_err());
    }
}
