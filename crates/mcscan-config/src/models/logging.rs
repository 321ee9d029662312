use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    pub level: String,
    pub use_color: bool,
    pub show_target: bool,
    pub show_timestamp: bool,
    pub time_format: String,

    /// Per-subsystem level overrides, keyed by [`LogType::as_str`].
    pub log_types: HashMap<String, String>,
}

/// Tags a log event with the subsystem that emitted it, so the logging
/// config's `log_types` table can filter independently of the global
/// `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogType {
    Orchestrator,
    TargetSource,
    RateLimiter,
    ConnectionWorker,
    ProtocolEngine,
    Classifier,
    Blacklist,
    Pipeline,
    MemoryGovernor,
    Config,
    Cli,
}

impl LogType {
    pub fn as_str(self) -> &'static str {
        match self {
            LogType::Orchestrator => "orchestrator",
            LogType::TargetSource => "target_source",
            LogType::RateLimiter => "rate_limiter",
            LogType::ConnectionWorker => "connection_worker",
            LogType::ProtocolEngine => "protocol_engine",
            LogType::Classifier => "classifier",
            LogType::Blacklist => "blacklist",
            LogType::Pipeline => "pipeline",
            LogType::MemoryGovernor => "memory_governor",
            LogType::Config => "config",
            LogType::Cli => "cli",
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut log_types = HashMap::new();
        log_types.insert("orchestrator".to_string(), "info".to_string());
        log_types.insert("target_source".to_string(), "info".to_string());
        log_types.insert("rate_limiter".to_string(), "warn".to_string());
        log_types.insert("connection_worker".to_string(), "debug".to_string());
        log_types.insert("protocol_engine".to_string(), "debug".to_string());
        log_types.insert("classifier".to_string(), "info".to_string());
        log_types.insert("blacklist".to_string(), "info".to_string());
        log_types.insert("pipeline".to_string(), "info".to_string());
        log_types.insert("memory_governor".to_string(), "warn".to_string());
        log_types.insert("config".to_string(), "info".to_string());
        log_types.insert("cli".to_string(), "info".to_string());

        Self {
            level: "info".to_string(),
            use_color: true,
            show_target: false,
            show_timestamp: true,
            time_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            log_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_type_round_trips_through_str() {
        for ty in [
            LogType::Orchestrator,
            LogType::TargetSource,
            LogType::RateLimiter,
            LogType::ConnectionWorker,
            LogType::ProtocolEngine,
            LogType::Classifier,
            LogType::Blacklist,
            LogType::Pipeline,
            LogType::MemoryGovernor,
            LogType::Config,
            LogType::Cli,
        ] {
            assert!(!ty.as_str().is_empty());
        }
    }

    #[test]
    fn default_covers_every_log_type() {
        let defaults = LoggingConfig::default();
        assert_eq!(defaults.log_types.len(), 11);
    }
}
