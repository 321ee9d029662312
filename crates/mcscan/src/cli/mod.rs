//! `clap`-derived entrypoint: `scan` runs a job from a config file,
//! `validate` parses and sanity-checks one without scanning (§10.4).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use ipnet::IpNet;
use tracing::{error, info};

use mcscan_config::{Config, DiscoveryMethod};

use crate::error::ScanError;
use crate::orchestrator::Orchestrator;
use crate::stats::SummaryRow;
use crate::targets::{ExternalSource, FileSource, RangeSource, TargetSource};
use crate::telemetry;

#[derive(Parser)]
#[command(author, version, about = "A high-fanout Minecraft server list ping scanner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scan job from a config file.
    Scan {
        #[arg(long, default_value = "mcscan.toml")]
        config: PathBuf,
    },
    /// Parse and sanity-check a config file without scanning.
    Validate {
        #[arg(long, default_value = "mcscan.toml")]
        config: PathBuf,
    },
}

/// Process exit codes (§6).
pub const EXIT_OK: i32 = 0;
pub const EXIT_CONFIG_ERROR: i32 = 1;
pub const EXIT_IO_ERROR: i32 = 2;
pub const EXIT_INTERRUPTED: i32 = 130;

pub async fn run(cli: Cli) -> i32 {
    match cli.command {
        Commands::Validate { config } => run_validate(&config),
        Commands::Scan { config } => run_scan(&config).await,
    }
}

fn run_validate(path: &Path) -> i32 {
    match mcscan_config::load(path) {
        Ok(config) => {
            println!("{path:?} is valid");
            println!(
                "discovery: {:?}, scanner.rate_limit: {}, concurrency.max_concurrent: {}",
                config.discovery.method, config.scanner.rate_limit, config.concurrency.max_concurrent
            );
            EXIT_OK
        }
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            EXIT_CONFIG_ERROR
        }
    }
}

async fn run_scan(path: &Path) -> i32 {
    let config = match mcscan_config::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    let _logging_guard = telemetry::init_logging(&config.logging);

    let source = match build_target_source(&config) {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "failed to initialize target source");
            return EXIT_IO_ERROR;
        }
    };

    let orchestrator = Orchestrator::new(config);
    let shutdown = orchestrator.shutdown_handle();

    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_shutdown.trigger("Ctrl-C received");
        }
    });

    info!("starting scan");
    match orchestrator.run(source).await {
        Ok(summary) => {
            print_summary(&summary);
            if shutdown.is_triggered() {
                EXIT_INTERRUPTED
            } else {
                EXIT_OK
            }
        }
        Err(e) => {
            error!(error = %e, "scan run failed");
            EXIT_IO_ERROR
        }
    }
}

fn build_target_source(config: &Config) -> Result<Box<dyn TargetSource>, ScanError> {
    let ports = config.discovery.ports.clone();

    match config.discovery.method {
        DiscoveryMethod::Range => {
            let networks: Vec<IpNet> = config
                .discovery
                .ranges
                .iter()
                .map(|raw| {
                    IpNet::from_str(raw)
                        .map_err(|e| ScanError::TargetSource(format!("invalid range {raw:?}: {e}")))
                })
                .collect::<Result<_, _>>()?;

            Ok(Box::new(RangeSource::new(
                networks,
                ports,
                config.discovery.batch_size,
                config.advanced.randomize_scan_order,
                config.advanced.skip_private_ranges,
                config.advanced.skip_reserved_ranges,
            )))
        }
        DiscoveryMethod::File => {
            let file_path = config
                .discovery
                .file_path
                .as_deref()
                .ok_or_else(|| ScanError::TargetSource("discovery.file_path is required".into()))?;
            let source = FileSource::load(file_path, &ports)
                .map_err(|e| ScanError::TargetSource(format!("failed to read {file_path}: {e}")))?;
            Ok(Box::new(source))
        }
        DiscoveryMethod::External => {
            let command = config
                .discovery
                .external_command
                .as_deref()
                .ok_or_else(|| ScanError::TargetSource("discovery.external_command is required".into()))?;

            let mut parts = command.split_whitespace();
            let program = parts
                .next()
                .ok_or_else(|| ScanError::TargetSource("discovery.external_command is empty".into()))?;

            let mut child = std::process::Command::new(program)
                .args(parts)
                .stdout(Stdio::piped())
                .spawn()
                .map_err(ScanError::Io)?;

            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| ScanError::TargetSource("external discovery command has no stdout".into()))?;

            let default_port = ports.first().copied().unwrap_or(25565);
            Ok(Box::new(ExternalSource::new(stdout, default_port)))
        }
    }
}

fn print_summary(summary: &SummaryRow) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["outcome", "count"]);
    table.add_row(vec![Cell::new("attempted"), Cell::new(summary.attempted)]);
    table.add_row(vec![Cell::new("succeeded"), Cell::new(summary.succeeded)]);
    table.add_row(vec![Cell::new("timeouts"), Cell::new(summary.timeouts)]);
    table.add_row(vec![Cell::new("refused"), Cell::new(summary.refused)]);
    table.add_row(vec![Cell::new("errors"), Cell::new(summary.errors)]);
    table.add_row(vec![Cell::new("blacklist_skipped"), Cell::new(summary.blacklist_skipped)]);
    table.add_row(vec![Cell::new("rate_limited"), Cell::new(summary.rate_limited)]);
    println!("{table}");
}
