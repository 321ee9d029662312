use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct BlacklistConfig {
    pub enabled: bool,
    pub auto_update: bool,
    pub file_path: String,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_update: true,
            file_path: "blacklist.txt".to_string(),
        }
    }
}
