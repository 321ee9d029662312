//! Notify hook: batches results and POSTs them to a webhook (§4.9, §6).
//!
//! Batching is size-triggered (`batch_size`) and time-triggered
//! (`flush_interval`), whichever comes first, so a slow trickle of results
//! doesn't sit unsent indefinitely.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use mcscan_config::{LogType, WebhookConfig};

use super::{HookOutcome, PipelineHook};
use crate::error::ScanError;
use crate::result::ScanResult;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct BatchPayload<'a> {
    count: usize,
    results: &'a [ScanResult],
}

pub struct NotifyHook {
    client: reqwest::Client,
    url: String,
    enabled: bool,
    batch_size: usize,
    buffer: Arc<Mutex<Vec<ScanResult>>>,
    shutdown: CancellationToken,
}

impl NotifyHook {
    pub fn new(config: &WebhookConfig, shutdown: CancellationToken) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            enabled: config.enabled,
            batch_size: config.batch_size.max(1),
            buffer: Arc::new(Mutex::new(Vec::new())),
            shutdown,
        }
    }

    /// Spawns the periodic flush task; must be called once after `new`.
    pub fn spawn_flusher(self: &Arc<Self>) {
        if !self.enabled {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        this.flush().await;
                    }
                    _ = this.shutdown.cancelled() => {
                        this.flush().await;
                        break;
                    }
                }
            }
        });
    }

    async fn flush(&self) {
        let batch = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return;
            }
            std::mem::take(&mut *buffer)
        };
        self.send(&batch).await;
    }

    async fn send(&self, batch: &[ScanResult]) {
        let payload = BatchPayload {
            count: batch.len(),
            results: batch,
        };

        let outcome = self.client.post(&self.url).json(&payload).send().await;
        match outcome {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(log_type = LogType::Pipeline.as_str(), batch_size = batch.len(), "webhook batch delivered");
            }
            Ok(response) => {
                warn!(log_type = LogType::Pipeline.as_str(), status = %response.status(), batch_size = batch.len(), "webhook rejected batch");
            }
            Err(e) => {
                error!(log_type = LogType::Pipeline.as_str(), error = %e, batch_size = batch.len(), "webhook delivery failed");
            }
        }
    }
}

#[async_trait]
impl PipelineHook for NotifyHook {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn process(&self, result: &mut ScanResult) -> Result<HookOutcome, ScanError> {
        if !self.enabled {
            return Ok(HookOutcome::Continue);
        }

        let full_batch = {
            let mut buffer = self.buffer.lock().await;
            buffer.push(result.clone());
            if buffer.len() >= self.batch_size {
                Some(std::mem::take(&mut *buffer))
            } else {
                None
            }
        };

        if let Some(batch) = full_batch {
            self.send(&batch).await;
        }

        Ok(HookOutcome::Continue)
    }

    async fn finalize(&self) -> Result<(), ScanError> {
        self.flush().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{OnlineModeGuess, Software};
    use chrono::Utc;
    use std::net::{IpAddr, Ipv4Addr};

    fn result() -> ScanResult {
        ScanResult {
            ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 25565,
            discovered_at: Utc::now(),
            protocol_id: Some(767),
            software: Software::Vanilla,
            version_string: Some("1.21".to_string()),
            motd_plain: String::new(),
            motd_raw: None,
            players_online: 1,
            players_max: 20,
            player_sample: Vec::new(),
            mods: Vec::new(),
            favicon_hash: None,
            favicon_bytes: None,
            latency_ms: None,
            online_mode_guess: OnlineModeGuess::Unknown,
            raw_document: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn disabled_hook_never_buffers() {
        let config = WebhookConfig {
            enabled: false,
            url: String::new(),
            batch_size: 2,
            include_stats: false,
        };
        let hook = NotifyHook::new(&config, CancellationToken::new());
        let mut r = result();
        assert_eq!(hook.process(&mut r).await.unwrap(), HookOutcome::Continue);
        assert!(hook.buffer.lock().await.is_empty());
    }

    #[tokio::test]
    async fn buffers_until_batch_size_reached() {
        let config = WebhookConfig {
            enabled: true,
            url: "http://127.0.0.1:0/webhook".to_string(),
            batch_size: 3,
            include_stats: false,
        };
        let hook = NotifyHook::new(&config, CancellationToken::new());
        hook.process(&mut result()).await.unwrap();
        hook.process(&mut result()).await.unwrap();
        assert_eq!(hook.buffer.lock().await.len(), 2);
    }
}
