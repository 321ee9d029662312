//! The module pipeline: an ordered chain of hooks each `ScanResult` passes
//! through once, declared order (§4.9, §5).

pub mod enrich;
pub mod filter;
pub mod notify;
pub mod persist;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use mcscan_config::LogType;

use crate::error::ScanError;
use crate::result::ScanResult;

const HOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Continue,
    Drop,
}

#[async_trait]
pub trait PipelineHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn initialize(&self) -> Result<(), ScanError> {
        Ok(())
    }

    async fn process(&self, result: &mut ScanResult) -> Result<HookOutcome, ScanError>;

    async fn finalize(&self) -> Result<(), ScanError> {
        Ok(())
    }
}

/// Runs every registered hook, in order, against each result. A hook that
/// errors is logged and treated as `Continue` (§7's pipeline hook error
/// handling); a hook that returns `Drop` stops the chain for that result.
pub struct Pipeline {
    hooks: Vec<Arc<dyn PipelineHook>>,
}

impl Pipeline {
    pub fn new(hooks: Vec<Arc<dyn PipelineHook>>) -> Self {
        Self { hooks }
    }

    pub async fn initialize(&self) -> Result<(), ScanError> {
        for hook in &self.hooks {
            hook.initialize().await?;
        }
        Ok(())
    }

    pub async fn finalize(&self) {
        // Reverse init order, per §4.7's startup/shutdown symmetry.
        for hook in self.hooks.iter().rev() {
            if let Err(e) = hook.finalize().await {
                error!(log_type = LogType::Pipeline.as_str(), hook = hook.name(), error = %e, "hook finalize failed");
            }
        }
    }

    pub async fn run(&self, mut result: ScanResult) {
        for hook in &self.hooks {
            let outcome = match tokio::time::timeout(HOOK_TIMEOUT, hook.process(&mut result)).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!(log_type = LogType::Pipeline.as_str(), hook = hook.name(), error = %e, "hook error, continuing");
                    HookOutcome::Continue
                }
                Err(_) => {
                    warn!(log_type = LogType::Pipeline.as_str(), hook = hook.name(), "hook timed out, continuing");
                    HookOutcome::Continue
                }
            };

            if outcome == HookOutcome::Drop {
                return;
            }
        }
    }
}
