use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GeolocationProvider {
    #[default]
    Local,
    Remote,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct GeolocationConfig {
    pub enabled: bool,
    pub provider: GeolocationProvider,
    pub database_path: String,
    /// Cache TTL, seconds.
    pub cache_duration: u64,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: GeolocationProvider::default(),
            database_path: "GeoLite2-City.mmdb".to_string(),
            cache_duration: 86_400,
        }
    }
}
