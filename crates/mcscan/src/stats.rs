//! Process-wide scan counters and the periodic progress broadcast (§4.7,
//! §9's "statistics counters are the only process-wide mutable state").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::debug;

use mcscan_config::LogType;

use crate::result::ScanResult;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rate_eps: f64,
    pub eta_seconds: Option<f64>,
    pub last_success: Option<Box<ScanResult>>,
}

#[derive(Debug, Default)]
struct Counters {
    attempted: AtomicU64,
    succeeded: AtomicU64,
    timeouts: AtomicU64,
    refused: AtomicU64,
    errors: AtomicU64,
    blacklist_skipped: AtomicU64,
    rate_limited: AtomicU64,
}

/// Atomic counters plus an EMA rate estimate, published to subscribers on
/// an interval by a dedicated task (§9: a single publisher task, no other
/// module-level mutable state).
pub struct Stats {
    counters: Counters,
    last_success: std::sync::Mutex<Option<Box<ScanResult>>>,
    tx: broadcast::Sender<ProgressEvent>,
}

impl Stats {
    pub fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(64);
        Arc::new(Self {
            counters: Counters::default(),
            last_success: std::sync::Mutex::new(None),
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    pub fn record(&self, outcome: &crate::result::ProbeOutcome) {
        self.counters.attempted.fetch_add(1, Ordering::Relaxed);
        use crate::result::ProbeOutcome::*;
        match outcome {
            Success(..) | LegacyDetected(..) => {
                self.counters.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            Timeout => {
                self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
            }
            Refused => {
                self.counters.refused.fetch_add(1, Ordering::Relaxed);
            }
            BlacklistSkipped => {
                self.counters.blacklist_skipped.fetch_add(1, Ordering::Relaxed);
            }
            RateLimited => {
                self.counters.rate_limited.fetch_add(1, Ordering::Relaxed);
            }
            Reset | Unreachable | ProtocolError(_) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_result(&self, result: &ScanResult) {
        *self.last_success.lock().expect("stats mutex poisoned") = Some(Box::new(result.clone()));
    }

    pub fn attempted(&self) -> u64 {
        self.counters.attempted.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.counters.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.attempted() - self.succeeded()
    }

    /// Spawns the periodic publisher. `refresh_rate` is events/sec;
    /// `universe_size` (if known) feeds the ETA estimate.
    pub fn spawn_publisher(
        self: &Arc<Self>,
        refresh_rate: f64,
        universe_size: Option<u64>,
    ) -> tokio::task::JoinHandle<()> {
        let stats = Arc::clone(self);
        let period = Duration::from_secs_f64((1.0 / refresh_rate.max(0.01)).min(60.0));

        tokio::spawn(async move {
            const ALPHA: f64 = 0.2;
            let mut ticker = interval(period);
            let mut last_attempted = stats.attempted();
            let mut last_tick = Instant::now();
            let mut ema_rate = 0.0;

            loop {
                ticker.tick().await;
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick).as_secs_f64().max(1e-6);
                let attempted = stats.attempted();
                let instantaneous = (attempted - last_attempted) as f64 / elapsed;
                ema_rate = ALPHA * instantaneous + (1.0 - ALPHA) * ema_rate;
                last_attempted = attempted;
                last_tick = now;

                let eta_seconds = universe_size.and_then(|total| {
                    if ema_rate <= 0.0 || attempted >= total {
                        None
                    } else {
                        Some((total - attempted) as f64 / ema_rate)
                    }
                });

                let event = ProgressEvent {
                    attempted,
                    succeeded: stats.succeeded(),
                    failed: stats.failed(),
                    rate_eps: ema_rate,
                    eta_seconds,
                    last_success: stats.last_success.lock().expect("stats mutex poisoned").clone(),
                };

                debug!(
                    log_type = LogType::Orchestrator.as_str(),
                    attempted = event.attempted,
                    rate_eps = event.rate_eps,
                    "progress"
                );

                // No subscribers is not an error; the event is simply dropped.
                let _ = stats.tx.send(event);
            }
        })
    }

    /// A shutdown-time summary table per-outcome-kind (§7, §10.6).
    pub fn summary(&self) -> SummaryRow {
        SummaryRow {
            attempted: self.attempted(),
            succeeded: self.succeeded(),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
            refused: self.counters.refused.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            blacklist_skipped: self.counters.blacklist_skipped.load(Ordering::Relaxed),
            rate_limited: self.counters.rate_limited.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SummaryRow {
    pub attempted: u64,
    pub succeeded: u64,
    pub timeouts: u64,
    pub refused: u64,
    pub errors: u64,
    pub blacklist_skipped: u64,
    pub rate_limited: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ProbeOutcome;

    #[test]
    fn records_outcome_kinds_into_distinct_counters() {
        let stats = Stats::new();
        stats.record(&ProbeOutcome::Timeout);
        stats.record(&ProbeOutcome::Refused);
        stats.record(&ProbeOutcome::BlacklistSkipped);

        let summary = stats.summary();
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.refused, 1);
        assert_eq!(summary.blacklist_skipped, 1);
        assert_eq!(summary.succeeded, 0);
    }
}
