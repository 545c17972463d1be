// SPDX-FileCopyrightText: 2026 Sentia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sentia - keeps dashboard summaries of accounting, storefront,
//! marketplace and ERP data fresh.
//!
//! This is the binary entry point for the Sentia sync service.

mod serve;
mod shutdown;
mod stack;
mod status;
mod sync_once;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures::future::join_all;
use sentia_config::SentiaConfig;
use sentia_core::{HealthStatus, PluginAdapter, SentiaError, SourceClient, SourceName};

use crate::sync_once::SyncTarget;

/// Sentia - background sync of business data for dashboards.
#[derive(Parser, Debug)]
#[command(name = "sentia", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync service and HTTP gateway.
    Serve,
    /// Sync one source, or all of them, once and exit.
    Sync {
        /// Source to sync (accounting, storefront, marketplace, erp).
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        source: Option<SourceName>,
        /// Sync every source.
        #[arg(long)]
        all: bool,
        /// Print results as JSON lines.
        #[arg(long)]
        json: bool,
    },
    /// Show source configuration and recent sync runs.
    Status {
        /// Only this source.
        source: Option<SourceName>,
        /// Number of runs to show.
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Manage Sentia configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate configuration and report which sources are configured.
    Check {
        /// Also call each configured source's health check.
        #[arg(long)]
        probe: bool,
    },
}

fn load_config(path: Option<&std::path::Path>) -> Option<SentiaConfig> {
    let loaded = match path {
        Some(path) => sentia_config::load_and_validate_path(path),
        None => sentia_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => Some(config),
        Err(errors) => {
            sentia_config::render_errors(&errors);
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(config) = load_config(cli.config.as_deref()) else {
        return ExitCode::FAILURE;
    };
    serve::init_tracing(&config.logging.level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Sync { source, all, json } => {
            let target = match (source, all) {
                (Some(source), false) => SyncTarget::One(source),
                _ => SyncTarget::All,
            };
            sync_once::run_sync(&config, target, json).await
        }
        Commands::Status {
            source,
            limit,
            json,
        } => status::run_status(&config, source, limit, json).await,
        Commands::Config {
            action: ConfigCommand::Check { probe },
        } => run_config_check(&config, probe).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// `sentia config check`: configuration already loaded and validated;
/// report per-source readiness and optionally probe upstream APIs.
async fn run_config_check(config: &SentiaConfig, probe: bool) -> Result<(), SentiaError> {
    println!("configuration OK");
    for descriptor in sentia_config::source_descriptors(config) {
        if descriptor.is_configured() {
            println!(
                "  {:<12} configured (every {}s, cache {}s, timeout {}s)",
                descriptor.name.to_string(),
                descriptor.sync_interval.as_secs(),
                descriptor.cache_ttl.as_secs(),
                descriptor.timeout.as_secs()
            );
        } else {
            println!(
                "  {:<12} not configured, missing {}",
                descriptor.name.to_string(),
                descriptor.missing.join(", ")
            );
        }
    }

    if !probe {
        return Ok(());
    }
    let clients = sentia_sources::build_clients(config)?;
    let checks = clients.iter().map(|client| async move {
        (client.source(), client.label(), client.health_check().await)
    });
    let mut unhealthy = 0;
    for (source, label, health) in join_all(checks).await {
        match health {
            Ok(HealthStatus::Healthy) => println!("  {source} [{label}]: reachable"),
            Ok(HealthStatus::Degraded(reason)) => {
                println!("  {source} [{label}]: degraded ({reason})");
            }
            Ok(HealthStatus::Unhealthy(reason)) => {
                unhealthy += 1;
                println!("  {source} [{label}]: unhealthy ({reason})");
            }
            Err(e) => {
                unhealthy += 1;
                println!("  {source} [{label}]: probe failed ({e})");
            }
        }
    }
    if unhealthy > 0 {
        return Err(SentiaError::Internal(format!(
            "{unhealthy} source(s) failed the health check"
        )));
    }
    Ok(())
}
