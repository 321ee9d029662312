use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct MemoryConfig {
    pub max_memory_mb: u64,
    /// Interval between RSS samples, seconds.
    pub gc_interval: u64,
    pub enable_monitoring: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 2048,
            gc_interval: 5,
            enable_monitoring: true,
        }
    }
}
