use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct AdvancedConfig {
    pub enable_tcp_nodelay: bool,
    pub socket_keepalive: bool,
    pub randomize_scan_order: bool,
    pub skip_private_ranges: bool,
    pub skip_reserved_ranges: bool,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            enable_tcp_nodelay: true,
            socket_keepalive: false,
            randomize_scan_order: true,
            skip_private_ranges: true,
            skip_reserved_ranges: true,
        }
    }
}
