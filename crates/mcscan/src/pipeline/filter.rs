//! Secondary filter hook: heuristics beyond the primary blacklist, applied
//! to the fully parsed result rather than the raw target (§4.9).

use async_trait::async_trait;

use super::{HookOutcome, PipelineHook};
use crate::error::ScanError;
use crate::result::ScanResult;

/// Drops results whose player counts look implausible (§3's
/// `player_count_is_plausible`) — a cheap signal that the document was
/// garbage or adversarially crafted, filtered out before the more
/// expensive enrich/persist/notify stages run.
pub struct PlausibilityFilter;

#[async_trait]
impl PipelineHook for PlausibilityFilter {
    fn name(&self) -> &'static str {
        "filter"
    }

    async fn process(&self, result: &mut ScanResult) -> Result<HookOutcome, ScanError> {
        if result.player_count_is_plausible() {
            Ok(HookOutcome::Continue)
        } else {
            Ok(HookOutcome::Drop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{OnlineModeGuess, Software};
    use chrono::Utc;
    use std::net::{IpAddr, Ipv4Addr};

    fn result(online: i64, max: i64) -> ScanResult {
        ScanResult {
            ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 25565,
            discovered_at: Utc::now(),
            protocol_id: Some(767),
            software: Software::Vanilla,
            version_string: Some("1.21".to_string()),
            motd_plain: String::new(),
            motd_raw: None,
            players_online: online,
            players_max: max,
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
    async fn plausible_counts_continue() {
        let mut r = result(5, 20);
        assert_eq!(PlausibilityFilter.process(&mut r).await.unwrap(), HookOutcome::Continue);
    }

    #[tokio::test]
    async fn implausible_counts_are_dropped() {
        let mut r = result(500, 20);
        assert_eq!(PlausibilityFilter.process(&mut r).await.unwrap(), HookOutcome::Drop);
    }
}
