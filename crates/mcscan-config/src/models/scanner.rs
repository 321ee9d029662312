use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ScannerConfig {
    /// Per-attempt socket timeout, seconds.
    pub timeout: f64,
    pub protocol_version: i32,
    pub scan_all_protocols: bool,
    pub protocol_versions: Vec<i32>,
    pub retries: u32,
    pub legacy_support: bool,
    pub rate_limit: u32,
    /// Per-destination token refill rate, tokens/sec (§4.5). Not named by
    /// the distilled spec's config section list; placed alongside the
    /// global `rate_limit` since it governs the same subsystem.
    pub per_host_rate_limit: u32,
    /// Per-destination bucket capacity (§4.5).
    pub burst_allowance: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            timeout: 3.0,
            protocol_version: 767,
            scan_all_protocols: false,
            protocol_versions: vec![767],
            retries: 1,
            legacy_support: true,
            rate_limit: 500,
            per_host_rate_limit: 1,
            burst_allowance: 5,
        }
    }
}
