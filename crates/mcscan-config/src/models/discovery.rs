use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMethod {
    #[default]
    Range,
    File,
    External,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct DiscoveryConfig {
    pub method: DiscoveryMethod,
    pub ports: Vec<u16>,
    pub batch_size: usize,
    /// CIDR or `a.b.c.d-e.f.g.h` ranges, consulted when `method = range`.
    pub ranges: Vec<String>,
    /// Target list file, consulted when `method = file`.
    pub file_path: Option<String>,
    /// Child process invoked to produce `address[:port]` lines on stdout,
    /// consulted when `method = external`.
    pub external_command: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            method: DiscoveryMethod::default(),
            ports: vec![25565],
            batch_size: 10_000,
            ranges: Vec::new(),
            file_path: None,
            external_command: None,
        }
    }
}
