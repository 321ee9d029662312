//! Typed, validated configuration for a scan run: the TOML-backed `Config`
//! enumerated across `scanner`/`discovery`/`concurrency`/`memory`/
//! `blacklist`/`geolocation`/`webhook`/`advanced`/`logging` sections, plus
//! the loader that parses, merges overlays, and validates it.

pub mod error;
pub mod loader;
pub mod models;

pub use error::ConfigError;
pub use loader::{load, load_with_overlay};
pub use models::advanced::AdvancedConfig;
pub use models::blacklist::BlacklistConfig;
pub use models::concurrency::ConcurrencyConfig;
pub use models::config::{Config, ConfigOverlay};
pub use models::discovery::{DiscoveryConfig, DiscoveryMethod};
pub use models::geolocation::{GeolocationConfig, GeolocationProvider};
pub use models::logging::{LogType, LoggingConfig};
pub use models::memory::MemoryConfig;
pub use models::scanner::ScannerConfig;
pub use models::webhook::WebhookConfig;
