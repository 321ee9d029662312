//! A high-fanout Minecraft server list ping scanner: wire codec consumer,
//! protocol engine, classifier, pipeline, and orchestrator wired together
//! behind a `clap` CLI.

pub mod classify;
pub mod cli;
pub mod engine;
pub mod error;
pub mod geo;
pub mod limiter;
pub mod memory_governor;
pub mod orchestrator;
pub mod pipeline;
pub mod result;
pub mod shutdown;
pub mod stats;
pub mod targets;
pub mod telemetry;
pub mod worker;

pub use error::ScanError;
pub use orchestrator::Orchestrator;
pub use result::{ProbeOutcome, ScanResult, Target};
