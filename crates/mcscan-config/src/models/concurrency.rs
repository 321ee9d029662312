use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ConcurrencyConfig {
    pub max_concurrent: usize,
    pub max_connections_per_host: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4_000,
            max_connections_per_host: 1,
        }
    }
}
