//! Logging setup (§4.8, §6's ambient logging stack).
//!
//! The corpus's own logging module builds a custom event formatter plus a
//! `log_type`-aware filtering layer so each subsystem's verbosity can be
//! tuned independently of the global level. This crate's `log_type` field
//! (via [`mcscan_config::LogType`]) is carried on every event the same way,
//! but the per-subsystem `log_types` table in [`LoggingConfig`] is not yet
//! wired into a filtering layer — every event is governed by the single
//! global `level` today (see DESIGN.md).

use std::str::FromStr;

use tracing_subscriber::{fmt, EnvFilter};

use mcscan_config::LoggingConfig;

pub struct LoggingGuard;

/// Initializes the global `tracing` subscriber. Must be called once, before
/// any other module logs.
pub fn init_logging(config: &LoggingConfig) -> LoggingGuard {
    let env_filter = EnvFilter::from_str(&format!("mcscan={}", config.level))
        .unwrap_or_else(|_| EnvFilter::from_default_env());

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_ansi(config.use_color)
        .with_target(config.show_target);

    if config.show_timestamp {
        builder.init();
    } else {
        builder.without_time().init();
    }

    LoggingGuard
}
