//! Shutdown coordination: a broadcast-backed cancellation signal plus a
//! bounded grace period, threaded through every suspension point (§4.7, §5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::info;

use mcscan_config::LogType;

#[derive(Debug)]
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
    token: CancellationToken,
    pub grace_period: Duration,
}

impl ShutdownController {
    pub fn new(grace_period: Duration) -> Arc<Self> {
        let (tx, _) = broadcast::channel(1);
        Arc::new(Self {
            tx,
            triggered: AtomicBool::new(false),
            token: CancellationToken::new(),
            grace_period,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn trigger(&self, reason: &str) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(log_type = LogType::Orchestrator.as_str(), reason, "initiating shutdown");
        self.token.cancel();
        let _ = self.tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_trigger_is_a_no_op() {
        let controller = ShutdownController::new(Duration::from_secs(1));
        let mut rx = controller.subscribe();
        controller.trigger("first");
        controller.trigger("second");
        rx.recv().await.unwrap();
        assert!(controller.is_triggered());
    }

    #[tokio::test]
    async fn token_is_cancelled_on_trigger() {
        let controller = ShutdownController::new(Duration::from_secs(1));
        let token = controller.token();
        assert!(!token.is_cancelled());
        controller.trigger("stop");
        assert!(token.is_cancelled());
    }
}
