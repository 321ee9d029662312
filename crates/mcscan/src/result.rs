//! The canonical records passed from the protocol engine through the
//! connection worker and into the module pipeline.

use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mcscan_protocol::ProtocolError;
use serde::{Deserialize, Serialize};

/// One scan target, produced once by the target source and consumed
/// exactly once by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub addr: IpAddr,
    pub port: u16,
    /// SNI-equivalent virtual host to advertise in the handshake, if the
    /// source knows one. Falls back to the dotted/bracketed address.
    pub hostname: Option<String>,
}

impl Target {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self {
            addr,
            port,
            hostname: None,
        }
    }

    pub fn handshake_address(&self) -> String {
        match &self.hostname {
            Some(name) => name.clone(),
            None => self.addr.to_string(),
        }
    }
}

/// Result of one probe attempt, before normalization into a [`ScanResult`].
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// The parsed document, measured latency, and the raw JSON body it was
    /// parsed from — kept verbatim so `ScanResult::raw_document` round-trips
    /// field-for-field through `ServerDocument::parse` (§3, §8).
    Success(Box<mcscan_protocol::document::ServerDocument>, Duration, String),
    LegacyDetected(Box<mcscan_protocol::legacy::LegacyStatus>),
    Timeout,
    Refused,
    Reset,
    Unreachable,
    ProtocolError(ProtocolError),
    BlacklistSkipped,
    RateLimited,
}

impl ProbeOutcome {
    pub fn kind_label(&self) -> &'static str {
        match self {
            ProbeOutcome::Success(..) => "success",
            ProbeOutcome::LegacyDetected(..) => "legacy_detected",
            ProbeOutcome::Timeout => "timeout",
            ProbeOutcome::Refused => "refused",
            ProbeOutcome::Reset => "reset",
            ProbeOutcome::Unreachable => "unreachable",
            ProbeOutcome::ProtocolError(_) => "protocol_error",
            ProbeOutcome::BlacklistSkipped => "blacklist_skipped",
            ProbeOutcome::RateLimited => "rate_limited",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Software {
    Vanilla,
    Paper,
    Spigot,
    Bukkit,
    Forge,
    Fabric,
    Velocity,
    Bungeecord,
    Purpur,
    Folia,
    Other,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnlineModeGuess {
    LikelyOnline,
    LikelyOffline,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSample {
    pub name: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    pub mod_id: String,
    pub version: String,
}

/// The canonical, normalized record surfaced to the module pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub ip: IpAddr,
    pub port: u16,
    pub discovered_at: DateTime<Utc>,
    pub protocol_id: Option<i64>,
    pub software: Software,
    pub version_string: Option<String>,
    pub motd_plain: String,
    pub motd_raw: Option<serde_json::Value>,
    pub players_online: i64,
    pub players_max: i64,
    pub player_sample: Vec<PlayerSample>,
    pub mods: Vec<ModRecord>,
    pub favicon_hash: Option<String>,
    pub favicon_bytes: Option<Vec<u8>>,
    pub latency_ms: Option<i64>,
    pub online_mode_guess: OnlineModeGuess,
    pub raw_document: String,
}

impl ScanResult {
    /// `players_online <= players_max + epsilon`; some servers misreport.
    pub fn player_count_is_plausible(&self) -> bool {
        const EPSILON: i64 = 1;
        self.players_online <= self.players_max + EPSILON
    }
}
