//! Top-level error taxonomy, composing each crate boundary's own error type
//! via `#[from]`. `anyhow` is used only at the CLI boundary (`cli::main`),
//! never here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] mcscan_config::ConfigError),

    #[error(transparent)]
    Blacklist(#[from] mcscan_blacklist::BlacklistError),

    #[error(transparent)]
    Protocol(#[from] mcscan_protocol::ProtocolError),

    #[error("target source error: {0}")]
    TargetSource(String),

    #[error("persistence sink error: {0}")]
    Persistence(String),

    #[error("dependency {name} failed to initialize: {reason}")]
    DependencyInit { name: &'static str, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
