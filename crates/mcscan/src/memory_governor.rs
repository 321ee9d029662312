//! Samples process RSS every second and throttles/evicts/shuts down in
//! response (§4.10). Polling shape grounded on the corpus's own system
//! metrics collector, which samples `sysinfo::Process` on an interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{info, warn};

use mcscan_config::LogType;

use crate::shutdown::ShutdownController;

/// Shared flag the producer polls to decide whether it may keep feeding the
/// target channel. `true` means "paused".
#[derive(Default)]
pub struct ProducerThrottle(AtomicBool);

impl ProducerThrottle {
    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, paused: bool) {
        self.0.store(paused, Ordering::Relaxed);
    }
}

pub struct MemoryGovernor {
    pub throttle: Arc<ProducerThrottle>,
}

impl MemoryGovernor {
    pub fn new() -> Self {
        Self {
            throttle: Arc::new(ProducerThrottle::default()),
        }
    }

    /// Spawns the 1s sampling loop. `max_memory_mb = 0` disables monitoring
    /// entirely (the task exits immediately). `on_evict` is invoked at most
    /// once per second once RSS crosses 95% of the ceiling, so the caller
    /// can trim the rate limiter's per-host map and the geolocation cache
    /// without this module needing to own either.
    pub fn spawn(
        &self,
        max_memory_mb: u64,
        enabled: bool,
        shutdown: Arc<ShutdownController>,
        on_evict: impl Fn() + Send + Sync + 'static,
    ) -> tokio::task::JoinHandle<()> {
        let throttle = Arc::clone(&self.throttle);

        tokio::spawn(async move {
            if !enabled || max_memory_mb == 0 {
                return;
            }

            let pid = Pid::from_u32(std::process::id());
            let mut system = System::new();
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            let ceiling = max_memory_mb * 1024 * 1024;

            loop {
                ticker.tick().await;
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::nothing().with_memory(),
                );
                let Some(process) = system.process(pid) else {
                    continue;
                };
                let rss = process.memory();

                if rss >= ceiling {
                    warn!(
                        log_type = LogType::MemoryGovernor.as_str(),
                        rss_mb = rss / (1024 * 1024),
                        max_memory_mb,
                        "RSS exceeded hard ceiling, initiating graceful shutdown"
                    );
                    shutdown.trigger("memory governor hard ceiling exceeded");
                    return;
                }

                if rss as f64 >= ceiling as f64 * 0.95 {
                    warn!(
                        log_type = LogType::MemoryGovernor.as_str(),
                        rss_mb = rss / (1024 * 1024),
                        "RSS above 95% of ceiling, evicting caches"
                    );
                    on_evict();
                }

                if rss as f64 >= ceiling as f64 * 0.85 {
                    if !throttle.is_paused() {
                        info!(log_type = LogType::MemoryGovernor.as_str(), "throttling producer");
                    }
                    throttle.set(true);
                } else if rss as f64 <= ceiling as f64 * 0.70 {
                    if throttle.is_paused() {
                        info!(log_type = LogType::MemoryGovernor.as_str(), "resuming producer");
                    }
                    throttle.set(false);
                }
            }
        })
    }
}

impl Default for MemoryGovernor {
    fn default() -> Self {
        Self::new()
    }
}
