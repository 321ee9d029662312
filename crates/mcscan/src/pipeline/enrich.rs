//! Enrich hook: warms the geolocation cache for each result's address
//! (§4.9). Lookups never block the chain indefinitely — the pipeline's
//! outer `HOOK_TIMEOUT` already bounds this — and a miss never drops the
//! result, it just leaves it unenriched.

use std::sync::Arc;

use async_trait::async_trait;

use super::{HookOutcome, PipelineHook};
use crate::error::ScanError;
use crate::geo::GeoCache;
use crate::result::ScanResult;

pub struct GeoEnrich {
    cache: Arc<GeoCache>,
}

impl GeoEnrich {
    pub fn new(cache: Arc<GeoCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl PipelineHook for GeoEnrich {
    fn name(&self) -> &'static str {
        "enrich"
    }

    async fn process(&self, result: &mut ScanResult) -> Result<HookOutcome, ScanError> {
        let _ = self.cache.lookup(result.ip).await;
        Ok(HookOutcome::Continue)
    }
}
