use serde::Deserialize;

use super::{
    advanced::AdvancedConfig, blacklist::BlacklistConfig, concurrency::ConcurrencyConfig,
    discovery::{DiscoveryConfig, DiscoveryMethod},
    geolocation::GeolocationConfig, logging::LoggingConfig,
    memory::MemoryConfig, scanner::ScannerConfig, webhook::WebhookConfig,
};

/// The full, validated configuration for a scan run.
///
/// Every section implements `Default`, so a file that omits a section
/// entirely is valid; a file with a key this struct doesn't recognize is
/// rejected by the `deny_unknown_fields` attribute on each section (and on
/// this struct itself).
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub discovery: DiscoveryConfig,
    pub concurrency: ConcurrencyConfig,
    pub memory: MemoryConfig,
    pub blacklist: BlacklistConfig,
    pub geolocation: GeolocationConfig,
    pub webhook: WebhookConfig,
    pub advanced: AdvancedConfig,
    pub logging: LoggingConfig,
}

/// A partial configuration, typically produced by CLI flag overrides, that
/// can be layered on top of a loaded [`Config`]. Unlike `Config` every field
/// is section-granular: a present section fully replaces the base section,
/// matching how the rest of the corpus layers config sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverlay {
    pub scanner: Option<ScannerConfig>,
    pub discovery: Option<DiscoveryConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub memory: Option<MemoryConfig>,
    pub blacklist: Option<BlacklistConfig>,
    pub geolocation: Option<GeolocationConfig>,
    pub webhook: Option<WebhookConfig>,
    pub advanced: Option<AdvancedConfig>,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn merge(&mut self, overlay: ConfigOverlay) {
        if let Some(scanner) = overlay.scanner {
            self.scanner = scanner;
        }
        if let Some(discovery) = overlay.discovery {
            self.discovery = discovery;
        }
        if let Some(concurrency) = overlay.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(memory) = overlay.memory {
            self.memory = memory;
        }
        if let Some(blacklist) = overlay.blacklist {
            self.blacklist = blacklist;
        }
        if let Some(geolocation) = overlay.geolocation {
            self.geolocation = geolocation;
        }
        if let Some(webhook) = overlay.webhook {
            self.webhook = webhook;
        }
        if let Some(advanced) = overlay.advanced {
            self.advanced = advanced;
        }
        if let Some(logging) = overlay.logging {
            self.logging = logging;
        }
    }

    /// Field-level sanity checks beyond what serde's type system already
    /// enforces (§6/§10.1: a `rate_limit` of zero is a validation error, not
    /// a parse error).
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        if self.scanner.rate_limit == 0 {
            return Err(crate::error::ConfigError::Validation(
                "scanner.rate_limit must be greater than zero".to_string(),
            ));
        }
        if self.concurrency.max_concurrent == 0 {
            return Err(crate::error::ConfigError::Validation(
                "concurrency.max_concurrent must be greater than zero".to_string(),
            ));
        }
        if self.discovery.ports.is_empty() {
            return Err(crate::error::ConfigError::Validation(
                "discovery.ports must not be empty".to_string(),
            ));
        }
        match self.discovery.method {
            DiscoveryMethod::Range if self.discovery.ranges.is_empty() => {
                return Err(crate::error::ConfigError::Validation(
                    "discovery.ranges must not be empty when discovery.method is \"range\"".to_string(),
                ));
            }
            DiscoveryMethod::File if self.discovery.file_path.is_none() => {
                return Err(crate::error::ConfigError::Validation(
                    "discovery.file_path is required when discovery.method is \"file\"".to_string(),
                ));
            }
            DiscoveryMethod::External if self.discovery.external_command.is_none() => {
                return Err(crate::error::ConfigError::Validation(
                    "discovery.external_command is required when discovery.method is \"external\"".to_string(),
                ));
            }
            _ => {}
        }
        if self.webhook.enabled && self.webhook.url.is_empty() {
            return Err(crate::error::ConfigError::Validation(
                "webhook.url is required when webhook.enabled is true".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates_once_a_range_is_supplied() {
        let mut config = Config::default();
        config.discovery.ranges = vec!["192.0.2.0/24".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_discovery_method_without_ranges_fails_validation() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn zero_rate_limit_fails_validation() {
        let mut config = Config::default();
        config.scanner.rate_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_replaces_only_present_sections() {
        let mut config = Config::default();
        let baseline_discovery = config.discovery.clone();

        let mut overlay = ConfigOverlay::default();
        overlay.scanner = Some(ScannerConfig {
            rate_limit: 1234,
            ..ScannerConfig::default()
        });
        config.merge(overlay);

        assert_eq!(config.scanner.rate_limit, 1234);
        assert_eq!(config.discovery, baseline_discovery);
    }
}
