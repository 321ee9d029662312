//! The connection worker pool: each worker pulls one target at a time,
//! gates it through the blacklist and rate limiters, probes it, and hands
//! a successful result to the pipeline (§4.6).

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use mcscan_blacklist::Blacklist;
use mcscan_config::LogType;

use crate::classify;
use crate::engine::{self, EngineConfig};
use crate::limiter::RateLimiterPair;
use crate::pipeline::Pipeline;
use crate::result::{ModRecord, OnlineModeGuess, PlayerSample, ProbeOutcome, ScanResult, Software, Target};
use crate::stats::Stats;

pub struct WorkerPool {
    pub engine_cfg: EngineConfig,
    pub limiter: Arc<RateLimiterPair>,
    pub blacklist: Arc<ArcSwap<Blacklist>>,
    pub pipeline: Arc<Pipeline>,
    pub stats: Arc<Stats>,
    pub shutdown: CancellationToken,
    pub max_connections_per_host: usize,
    pub probe_deadline: Duration,
}

impl WorkerPool {
    /// Spawns `worker_count` tasks sharing `rx`. Returns their handles so
    /// the caller can await a graceful drain.
    pub fn spawn(
        self: Arc<Self>,
        worker_count: usize,
        rx: mpsc::Receiver<Target>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let rx = Arc::new(Mutex::new(rx));
        let host_permits: Arc<DashMap<IpAddr, Arc<Semaphore>>> = Arc::new(DashMap::new());

        (0..worker_count.max(1))
            .map(|id| {
                let pool = Arc::clone(&self);
                let rx = Arc::clone(&rx);
                let host_permits = Arc::clone(&host_permits);
                tokio::spawn(async move { pool.run(id, rx, host_permits).await })
            })
            .collect()
    }

    async fn run(
        &self,
        id: usize,
        rx: Arc<Mutex<mpsc::Receiver<Target>>>,
        host_permits: Arc<DashMap<IpAddr, Arc<Semaphore>>>,
    ) {
        loop {
            let target = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                target = async { rx.lock().await.recv().await } => match target {
                    Some(target) => target,
                    None => break,
                },
            };

            self.handle(target, &host_permits).await;
        }
        debug!(log_type = LogType::ConnectionWorker.as_str(), worker_id = id, "worker exited");
    }

    async fn handle(&self, target: Target, host_permits: &DashMap<IpAddr, Arc<Semaphore>>) {
        if self.blacklist.load().contains(target.addr) {
            self.stats.record(&ProbeOutcome::BlacklistSkipped);
            return;
        }

        if !self.limiter.acquire(target.addr, self.probe_deadline).await {
            self.stats.record(&ProbeOutcome::RateLimited);
            return;
        }

        let semaphore = {
            let entry = host_permits
                .entry(target.addr)
                .or_insert_with(|| Arc::new(Semaphore::new(self.max_connections_per_host.max(1))));
            Arc::clone(&entry)
        };
        let Ok(_permit) = semaphore.acquire_owned().await else {
            return;
        };

        let outcome = engine::probe(&target, &self.engine_cfg).await;
        self.stats.record(&outcome);

        if let Some(result) = normalize(&target, &outcome) {
            self.stats.record_result(&result);
            self.pipeline.run(result).await;
        }
    }
}

/// Turns a probe's raw outcome into the canonical [`ScanResult`]; `None`
/// for anything that isn't a full status response (§4.3).
fn normalize(target: &Target, outcome: &ProbeOutcome) -> Option<ScanResult> {
    match outcome {
        ProbeOutcome::Success(doc, latency, raw_json) => {
            Some(normalize_modern(target, doc, *latency, raw_json))
        }
        ProbeOutcome::LegacyDetected(status) => Some(normalize_legacy(target, status)),
        _ => None,
    }
}

fn normalize_modern(
    target: &Target,
    doc: &mcscan_protocol::document::ServerDocument,
    latency: Duration,
    raw_json: &str,
) -> ScanResult {
    let software = classify::classify_software(doc);

    let player_sample: Vec<PlayerSample> = doc
        .players
        .sample
        .iter()
        .map(|p| PlayerSample {
            name: p.name.clone(),
            uuid: p.id.clone(),
        })
        .collect();

    let mods = classify::dedup_mods(extract_mods(doc));

    let favicon = doc.favicon.as_deref().and_then(classify::decode_favicon);

    ScanResult {
        ip: target.addr,
        port: target.port,
        discovered_at: chrono::Utc::now(),
        protocol_id: Some(doc.version.protocol),
        software,
        version_string: Some(doc.version.name.clone()),
        motd_plain: doc.motd_plain(),
        motd_raw: doc.description.clone(),
        players_online: doc.players.online,
        players_max: doc.players.max,
        online_mode_guess: classify::guess_online_mode(&player_sample),
        player_sample,
        mods,
        favicon_hash: favicon.as_ref().map(|f| f.hash.clone()),
        favicon_bytes: favicon.map(|f| f.bytes),
        latency_ms: Some(latency.as_millis() as i64),
        raw_document: raw_json.to_string(),
    }
}

/// Mods from either the legacy Forge `modinfo.modList` or the modern
/// `forgeData.mods` array (§4.3); the latter keys fields `modId`/`modmarker`
/// rather than the legacy `modid`/`version` names.
fn extract_mods(doc: &mcscan_protocol::document::ServerDocument) -> Vec<ModRecord> {
    let mut mods: Vec<ModRecord> = doc
        .forge_modinfo
        .as_ref()
        .map(|info| {
            info.mod_list
                .iter()
                .map(|m| ModRecord {
                    mod_id: m.modid.clone(),
                    version: m.version.clone(),
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if let Some(Value::Object(forge_data)) = &doc.forge_data {
        if let Some(Value::Array(entries)) = forge_data.get("mods") {
            for entry in entries {
                let Some(mod_id) = entry.get("modId").and_then(Value::as_str) else {
                    continue;
                };
                let version = entry.get("modmarker").and_then(Value::as_str).unwrap_or_default();
                mods.push(ModRecord {
                    mod_id: mod_id.to_string(),
                    version: version.to_string(),
                });
            }
        }
    }

    mods
}

fn normalize_legacy(target: &Target, status: &mcscan_protocol::legacy::LegacyStatus) -> ScanResult {
    ScanResult {
        ip: target.addr,
        port: target.port,
        discovered_at: chrono::Utc::now(),
        protocol_id: status.protocol_version,
        software: Software::Vanilla,
        version_string: status.version_name.clone(),
        motd_plain: status.motd.clone(),
        motd_raw: None,
        players_online: status.online_players,
        players_max: status.max_players,
        player_sample: Vec::new(),
        mods: Vec::new(),
        favicon_hash: None,
        favicon_bytes: None,
        latency_ms: None,
        online_mode_guess: OnlineModeGuess::Unknown,
        raw_document: format!("{status:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn legacy_outcome_normalizes_into_vanilla_software() {
        let target = Target::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 25565);
        let status = mcscan_protocol::legacy::LegacyStatus {
            motd: "hi".to_string(),
            online_players: 2,
            max_players: 20,
            protocol_version: Some(61),
            version_name: Some("1.6.4".to_string()),
        };
        let result = normalize_legacy(&target, &status);
        assert_eq!(result.software, Software::Vanilla);
        assert_eq!(result.players_online, 2);
    }

    #[test]
    fn non_status_outcomes_normalize_to_none() {
        let target = Target::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 25565);
        assert!(normalize(&target, &ProbeOutcome::Timeout).is_none());
    }

    #[test]
    fn extracts_mods_from_modern_forge_data() {
        let doc: mcscan_protocol::document::ServerDocument = serde_json::from_value(serde_json::json!({
            "version": {"name": "Forge 1.20.1", "protocol": 765},
            "players": {"max": 20, "online": 0},
            "forgeData": {"mods": [{"modId": "jei", "modmarker": "15.2.0"}]},
        }))
        .unwrap();

        let target = Target::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 25565);
        let result = normalize_modern(&target, &doc, Duration::from_millis(5), "{}");
        assert_eq!(result.mods, vec![ModRecord { mod_id: "jei".to_string(), version: "15.2.0".to_string() }]);
    }

    #[test]
    fn raw_document_round_trips_to_an_equal_document() {
        let raw = r#"{"version":{"name":"1.21","protocol":767},"players":{"max":20,"online":1,"sample":[{"name":"Steve","id":"a0000000-0000-4000-8000-000000000001"}]},"description":"hi"}"#;
        let target = Target::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 25565);
        let doc = mcscan_protocol::document::ServerDocument::parse(raw).unwrap();
        let result = normalize_modern(&target, &doc, Duration::from_millis(5), raw);

        let reparsed = mcscan_protocol::document::ServerDocument::parse(&result.raw_document).unwrap();
        assert_eq!(reparsed.version.protocol, result.protocol_id.unwrap());
        assert_eq!(reparsed.players.online, result.players_online);
        assert_eq!(reparsed.motd_plain(), result.motd_plain);
    }
}
