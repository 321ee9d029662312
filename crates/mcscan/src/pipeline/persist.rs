//! Persist hook and the persistence sink contract (§6, §4.9).
//!
//! The sink interface is implemented here only by an in-process reference
//! store, suitable for tests and small runs; an embedded single-file store
//! or client/server RDBMS are collaborators outside this crate's scope. On
//! sink failure the result is appended to a durable dead-letter file for
//! later reprocessing instead of being lost (§7).

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

use mcscan_config::LogType;

use super::{HookOutcome, PipelineHook};
use crate::error::ScanError;
use crate::result::{ModRecord, PlayerSample, ScanResult};

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn init(&self) -> Result<(), ScanError> {
        Ok(())
    }
    async fn upsert_server(&self, result: &ScanResult) -> Result<(), ScanError>;
    async fn record_status(&self, result: &ScanResult) -> Result<(), ScanError>;
    async fn upsert_player(&self, player: &PlayerSample, seen_at: DateTime<Utc>, server: (IpAddr, u16));
    async fn upsert_mod(&self, m: &ModRecord, server: (IpAddr, u16));
    async fn upsert_favicon(&self, hash: &str, bytes: &[u8]);
    async fn close(&self) -> Result<(), ScanError> {
        Ok(())
    }
}

#[derive(Default)]
struct Store {
    servers: HashMap<(IpAddr, u16), ScanResult>,
    status_history: HashMap<(IpAddr, u16), Vec<ScanResult>>,
    players: HashMap<String, PlayerSample>,
    mods: HashMap<(IpAddr, u16), Vec<ModRecord>>,
    favicons: HashMap<String, Vec<u8>>,
}

/// The reference in-process sink: good enough for tests and small runs,
/// everything guarded by one mutex since contention at this scale is not
/// the bottleneck (the worker pool and network I/O are).
pub struct InMemorySink {
    store: Mutex<Store>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
        }
    }

    pub async fn server_count(&self) -> usize {
        self.store.lock().await.servers.len()
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceSink for InMemorySink {
    async fn upsert_server(&self, result: &ScanResult) -> Result<(), ScanError> {
        self.store.lock().await.servers.insert((result.ip, result.port), result.clone());
        Ok(())
    }

    async fn record_status(&self, result: &ScanResult) -> Result<(), ScanError> {
        self.store
            .lock()
            .await
            .status_history
            .entry((result.ip, result.port))
            .or_default()
            .push(result.clone());
        Ok(())
    }

    async fn upsert_player(&self, player: &PlayerSample, _seen_at: DateTime<Utc>, _server: (IpAddr, u16)) {
        self.store.lock().await.players.insert(player.uuid.clone(), player.clone());
    }

    async fn upsert_mod(&self, m: &ModRecord, server: (IpAddr, u16)) {
        let mut store = self.store.lock().await;
        let mods = store.mods.entry(server).or_default();
        if !mods.iter().any(|existing| existing.mod_id == m.mod_id) {
            mods.push(m.clone());
        }
    }

    async fn upsert_favicon(&self, hash: &str, bytes: &[u8]) {
        let mut store = self.store.lock().await;
        store.favicons.entry(hash.to_string()).or_insert_with(|| bytes.to_vec());
    }
}

/// Appends results the sink failed to persist, as JSON Lines, so they can
/// be reprocessed later (§7).
pub struct DeadLetterFile {
    path: PathBuf,
}

impl DeadLetterFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn append(&self, result: &ScanResult) {
        let line = match serde_json::to_string(result) {
            Ok(line) => line,
            Err(e) => {
                error!(log_type = LogType::Pipeline.as_str(), error = %e, "failed to serialize result for dead-letter file");
                return;
            }
        };

        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await;
        match file {
            Ok(mut file) => {
                if let Err(e) = file.write_all(format!("{line}\n").as_bytes()).await {
                    error!(log_type = LogType::Pipeline.as_str(), error = %e, "failed to append to dead-letter file");
                }
            }
            Err(e) => {
                error!(log_type = LogType::Pipeline.as_str(), path = %self.path.display(), error = %e, "failed to open dead-letter file");
            }
        }
    }
}

/// Serializes writes per `(ip, port)` with a keyed mutex (§5), not
/// reentrant, matching the spec's ordering guarantee for persistence.
pub struct PersistHook {
    sink: Arc<dyn PersistenceSink>,
    dead_letter: DeadLetterFile,
    locks: DashMap<(IpAddr, u16), Arc<Mutex<()>>>,
}

impl PersistHook {
    pub fn new(sink: Arc<dyn PersistenceSink>, dead_letter_path: PathBuf) -> Self {
        Self {
            sink,
            dead_letter: DeadLetterFile::new(dead_letter_path),
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, key: (IpAddr, u16)) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))))
    }
}

#[async_trait]
impl PipelineHook for PersistHook {
    fn name(&self) -> &'static str {
        "persist"
    }

    async fn initialize(&self) -> Result<(), ScanError> {
        self.sink.init().await
    }

    async fn process(&self, result: &mut ScanResult) -> Result<HookOutcome, ScanError> {
        let key = (result.ip, result.port);
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        let persisted = async {
            self.sink.upsert_server(result).await?;
            self.sink.record_status(result).await?;
            for player in &result.player_sample {
                self.sink.upsert_player(player, result.discovered_at, key).await;
            }
            for m in &result.mods {
                self.sink.upsert_mod(m, key).await;
            }
            if let (Some(hash), Some(bytes)) = (&result.favicon_hash, &result.favicon_bytes) {
                self.sink.upsert_favicon(hash, bytes).await;
            }
            Ok::<(), ScanError>(())
        }
        .await;

        if let Err(e) = persisted {
            error!(log_type = LogType::Pipeline.as_str(), %e, "persistence failed, writing to dead-letter file");
            self.dead_letter.append(result).await;
        }

        Ok(HookOutcome::Continue)
    }

    async fn finalize(&self) -> Result<(), ScanError> {
        self.sink.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{OnlineModeGuess, Software};
    use std::net::Ipv4Addr;

    fn result() -> ScanResult {
        ScanResult {
            ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 25565,
            discovered_at: Utc::now(),
            protocol_id: Some(767),
            software: Software::Vanilla,
            version_string: Some("1.21".to_string()),
            motd_plain: "hello".to_string(),
            motd_raw: None,
            players_online: 1,
            players_max: 20,
            player_sample: vec![PlayerSample { name: "Alice".to_string(), uuid: "a0000000-0000-4000-8000-000000000001".to_string() }],
            mods: vec![ModRecord { mod_id: "jei".to_string(), version: "15.2.0".to_string() }],
            favicon_hash: None,
            favicon_bytes: None,
            latency_ms: Some(20),
            online_mode_guess: OnlineModeGuess::LikelyOnline,
            raw_document: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn persists_server_players_and_mods() {
        let sink = Arc::new(InMemorySink::new());
        let hook = PersistHook::new(sink.clone(), std::env::temp_dir().join("mcscan-test-dead-letter.jsonl"));
        let mut r = result();

        let outcome = hook.process(&mut r).await.unwrap();
        assert_eq!(outcome, HookOutcome::Continue);
        assert_eq!(sink.server_count().await, 1);

        let store = sink.store.lock().await;
        assert_eq!(store.players.len(), 1);
        assert_eq!(store.mods.get(&(r.ip, r.port)).unwrap().len(), 1);
    }
}
