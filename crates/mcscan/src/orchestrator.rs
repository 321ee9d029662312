//! Wires every subsystem together and drives one scan run end to end
//! (§4.7). Startup order: persistence sink, geolocation, blacklist,
//! notifier, memory governor, producer, workers. Shutdown reverses it,
//! bounded by `grace_period`.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tracing::{info, warn};

use mcscan_blacklist::Blacklist;
use mcscan_config::{Config, GeolocationProvider, LogType};

use crate::engine::EngineConfig;
use crate::error::ScanError;
use crate::geo::{GeoCache, GeolocationBackend, LocalBackend, RemoteBackend};
use crate::limiter::RateLimiterPair;
use crate::memory_governor::MemoryGovernor;
use crate::pipeline::enrich::GeoEnrich;
use crate::pipeline::filter::PlausibilityFilter;
use crate::pipeline::notify::NotifyHook;
use crate::pipeline::persist::{InMemorySink, PersistHook};
use crate::pipeline::{Pipeline, PipelineHook};
use crate::result::Target;
use crate::shutdown::ShutdownController;
use crate::stats::{Stats, SummaryRow};
use crate::targets::TargetSource;
use crate::worker::WorkerPool;

const DEAD_LETTER_FILE: &str = "mcscan-dead-letter.jsonl";

pub struct Orchestrator {
    config: Config,
    shutdown: Arc<ShutdownController>,
    stats: Arc<Stats>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let grace_period = Duration::from_secs_f64(config.scanner.timeout * 2.0);
        Self {
            config,
            shutdown: ShutdownController::new(grace_period),
            stats: Stats::new(),
        }
    }

    pub fn shutdown_handle(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    pub fn stats_handle(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    /// Runs the scan to completion: either `source` is exhausted or
    /// shutdown is triggered (Ctrl-C, memory hard ceiling).
    pub async fn run(&self, source: Box<dyn TargetSource>) -> Result<SummaryRow, ScanError> {
        let geo_backend: Arc<dyn GeolocationBackend> = if self.config.geolocation.enabled {
            match self.config.geolocation.provider {
                GeolocationProvider::Remote => Arc::new(RemoteBackend::new()),
                GeolocationProvider::Local => {
                    Arc::new(LocalBackend::new(self.config.geolocation.database_path.clone()))
                }
            }
        } else {
            Arc::new(LocalBackend::new(self.config.geolocation.database_path.clone()))
        };
        let geo_cache = Arc::new(GeoCache::new(
            geo_backend,
            Duration::from_secs(self.config.geolocation.cache_duration),
        ));

        let blacklist = if self.config.blacklist.enabled {
            Blacklist::load_file(&self.config.blacklist.file_path).unwrap_or_else(|e| {
                warn!(log_type = LogType::Blacklist.as_str(), error = %e, "failed to load blacklist, starting empty");
                Blacklist::new()
            })
        } else {
            Blacklist::new()
        };
        let blacklist = Arc::new(ArcSwap::from_pointee(blacklist));
        if self.config.blacklist.enabled && self.config.blacklist.auto_update {
            mcscan_blacklist::spawn_auto_update(
                self.config.blacklist.file_path.clone().into(),
                Arc::clone(&blacklist),
            );
        }

        let notify = Arc::new(NotifyHook::new(&self.config.webhook, self.shutdown.token()));
        notify.spawn_flusher();

        let hooks: Vec<Arc<dyn PipelineHook>> = vec![
            Arc::new(PlausibilityFilter),
            Arc::new(GeoEnrich::new(Arc::clone(&geo_cache))),
            Arc::new(PersistHook::new(
                Arc::new(InMemorySink::new()),
                std::env::temp_dir().join(DEAD_LETTER_FILE),
            )),
            notify,
        ];
        let pipeline = Arc::new(Pipeline::new(hooks));
        pipeline.initialize().await?;

        let limiter = Arc::new(RateLimiterPair::new(
            self.config.scanner.rate_limit,
            self.config.scanner.per_host_rate_limit,
            self.config.scanner.burst_allowance,
        ));

        let memory_governor = MemoryGovernor::new();
        let evict_geo = Arc::clone(&geo_cache);
        let evict_limiter = Arc::clone(&limiter);
        memory_governor.spawn(
            self.config.memory.max_memory_mb,
            self.config.memory.enable_monitoring,
            Arc::clone(&self.shutdown),
            move || {
                evict_limiter.evict_idle_hosts();
                evict_geo.evict_oldest();
            },
        );

        self.stats.spawn_publisher(2.0, None);

        let (tx, rx) = mpsc::channel::<Target>(self.config.discovery.batch_size.max(1) * 4);
        let producer = spawn_producer(
            source,
            tx,
            Arc::clone(&memory_governor.throttle),
            self.shutdown.token(),
        );

        let pool = Arc::new(WorkerPool {
            engine_cfg: EngineConfig {
                timeout: Duration::from_secs_f64(self.config.scanner.timeout),
                retries: self.config.scanner.retries,
                protocol_ids: if self.config.scanner.scan_all_protocols {
                    self.config.scanner.protocol_versions.clone()
                } else {
                    vec![self.config.scanner.protocol_version]
                },
                legacy_support: self.config.scanner.legacy_support,
                tcp_nodelay: self.config.advanced.enable_tcp_nodelay,
                socket_keepalive: self.config.advanced.socket_keepalive,
            },
            limiter,
            blacklist,
            pipeline: Arc::clone(&pipeline),
            stats: Arc::clone(&self.stats),
            shutdown: self.shutdown.token(),
            max_connections_per_host: self.config.concurrency.max_connections_per_host,
            probe_deadline: Duration::from_secs_f64(self.config.scanner.timeout),
        });
        let workers = pool.spawn(self.config.concurrency.max_concurrent, rx);

        producer.await.ok();
        for worker in workers {
            let _ = worker.await;
        }

        pipeline.finalize().await;

        info!(log_type = LogType::Orchestrator.as_str(), summary = ?self.stats.summary(), "scan complete");
        Ok(self.stats.summary())
    }
}

fn spawn_producer(
    mut source: Box<dyn TargetSource>,
    tx: mpsc::Sender<Target>,
    throttle: Arc<crate::memory_governor::ProducerThrottle>,
    shutdown: tokio_util::sync::CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || loop {
        if shutdown.is_cancelled() {
            return;
        }
        if throttle.is_paused() {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        }
        match source.next() {
            Some(target) => {
                if tx.blocking_send(target).is_err() {
                    return;
                }
            }
            None => return,
        }
    })
}
