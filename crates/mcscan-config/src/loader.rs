use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::models::config::{Config, ConfigOverlay};

/// Loads and validates a [`Config`] from a TOML file at `path`.
///
/// Unknown top-level or section keys are a hard error via each struct's
/// `deny_unknown_fields` attribute; missing sections fall back to their
/// `Default` impls.
pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = toml::from_str(&raw)?;
    config.validate()?;

    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Loads a base config from `path` and layers `overlay` on top of it,
/// re-validating the merged result.
pub fn load_with_overlay(
    path: impl AsRef<Path>,
    overlay: ConfigOverlay,
) -> Result<Config, ConfigError> {
    let mut config = load(path)?;
    config.merge(overlay);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_not_found() {
        let err = load("/nonexistent/mcscan.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn loads_minimal_file_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcscan.toml");
        fs::write(
            &path,
            "[scanner]\nrate_limit = 100\n\n[discovery]\nranges = [\"192.0.2.0/24\"]\n",
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.scanner.rate_limit, 100);
        assert_eq!(config.scanner.timeout, crate::models::scanner::ScannerConfig::default().timeout);
    }

    #[test]
    fn rejects_unknown_top_level_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcscan.toml");
        fs::write(&path, "totally_unknown_section = true\n").unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn rejects_invalid_rate_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcscan.toml");
        fs::write(&path, "[scanner]\nrate_limit = 0\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn overlay_replaces_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcscan.toml");
        fs::write(
            &path,
            "[scanner]\nrate_limit = 100\n\n[discovery]\nranges = [\"192.0.2.0/24\"]\n",
        )
        .unwrap();

        let mut overlay = ConfigOverlay::default();
        overlay.discovery = Some(crate::models::discovery::DiscoveryConfig {
            batch_size: 42,
            ranges: vec!["192.0.2.0/24".to_string()],
            ..Default::default()
        });

        let config = load_with_overlay(&path, overlay).unwrap();
        assert_eq!(config.discovery.batch_size, 42);
        assert_eq!(config.scanner.rate_limit, 100);
    }
}
