mod commands;
mod junit;
mod session;

use clap::{Parser, Subcommand};
use commands::{SanityOptions, UpgradeOptions};
use msi_core::HarnessConfig;
use msi_sanity::{ProcessHost, SuiteProperties};
use session::Session;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "msi", about = "Managed services integration test harness")]
struct Cli {
    /// YAML config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Collect cluster resources for failed tests
    #[arg(long, global = true)]
    log_collector: bool,
    /// Base directory for collected resources and session exit reasons
    #[arg(long, global = true)]
    log_collector_dir: Option<PathBuf>,
    /// Session log file, removed at start
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Write a JUnit XML report here
    #[arg(long, global = true)]
    junitxml: Option<PathBuf>,
    /// Kubernetes API URL of the cluster under test
    #[arg(long, global = true, env = "KUBE_API_URL")]
    kube_api_url: Option<String>,
    /// Bearer token for the Kubernetes API
    #[arg(long, global = true, env = "KUBE_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Skip TLS verification of the Kubernetes API
    #[arg(long, global = true)]
    insecure_skip_tls_verify: bool,
    /// Storage classes the cluster must provide, comma separated
    #[arg(long, global = true, value_delimiter = ',')]
    storage_classes: Vec<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check cluster health; exits the session on failure
    Sanity {
        /// Report the failure as a failed test instead of aborting
        #[arg(long)]
        no_exit: bool,
        /// Exit code used when aborting
        #[arg(long)]
        exit_code: Option<i32>,
        /// Seconds to wait for all nodes to become Ready first
        #[arg(long)]
        wait_nodes_ready: Option<u64>,
    },
    /// Wait for a scheduled OCP upgrade to complete
    WaitUpgrade {
        #[arg(long)]
        ocp_target_version: String,
        #[arg(long)]
        cluster_name: Option<String>,
        /// Override the upgrade timeout, in minutes
        #[arg(long)]
        timeout_minutes: Option<u64>,
    },
    /// Print a manual upgrade policy scheduled ten minutes from now
    UpgradePolicy {
        #[arg(long)]
        ocp_target_version: String,
    },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_logging(&config.log_file)?;
    debug!("Effective config:\n{}", config.to_json_pretty()?);

    let status = match &cli.command {
        Commands::UpgradePolicy { ocp_target_version } => {
            println!("{}", commands::upgrade_policy_json(ocp_target_version)?);
            0
        }
        Commands::Sanity {
            wait_nodes_ready, ..
        } => {
            let client = commands::api_client(
                &config,
                cli.token.as_deref(),
                cli.insecure_skip_tls_verify,
            )?;
            let session = Session::new("msi", SuiteProperties::new());
            let host = ProcessHost::new().on_exit({
                let session = session.clone();
                let junit = cli.junitxml.clone();
                move |code| {
                    session.conclude(code, junit.as_deref());
                }
            });
            let options = SanityOptions {
                wait_nodes_ready: wait_nodes_ready.map(Duration::from_secs),
            };

            commands::run_sanity(&session, &config, &client, &host, &options).await;
            conclude(&session, cli.junitxml.as_deref())
        }
        Commands::WaitUpgrade {
            ocp_target_version,
            cluster_name,
            timeout_minutes,
        } => {
            let client = commands::api_client(
                &config,
                cli.token.as_deref(),
                cli.insecure_skip_tls_verify,
            )?;
            let session = Session::new("msi", SuiteProperties::new());
            let options = UpgradeOptions {
                target_version: ocp_target_version.clone(),
                cluster_name: cluster_name.clone(),
                timeout: timeout_minutes.map(timeout_from_minutes).transpose()?,
            };

            commands::run_wait_upgrade(&session, &config, &client, &options).await;
            conclude(&session, cli.junitxml.as_deref())
        }
    };

    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}

fn conclude(session: &Session, junit: Option<&Path>) -> i32 {
    let status = session.exit_status();
    session.conclude(status, junit);
    status
}

/// `--timeout-minutes` as a duration, rejecting values that overflow
fn timeout_from_minutes(minutes: u64) -> miette::Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| miette::miette!("--timeout-minutes {} is too large", minutes))
}

/// Config file (or defaults) overlaid with command line flags
fn load_config(cli: &Cli) -> miette::Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_yaml_file(path)?,
        None => HarnessConfig::default(),
    };

    if cli.log_collector {
        config.log_collector.enabled = true;
    }
    if let Some(dir) = &cli.log_collector_dir {
        config.log_collector.base_dir = dir.clone();
    }
    if let Some(log_file) = &cli.log_file {
        config.log_file = log_file.clone();
    }
    if let Some(url) = &cli.kube_api_url {
        config.kube_api_url = Some(url.clone());
    }
    if !cli.storage_classes.is_empty() {
        config.storage_classes = cli.storage_classes.clone();
    }
    if let Commands::Sanity {
        no_exit, exit_code, ..
    } = &cli.command
    {
        if *no_exit {
            config.sanity.exit_on_failure = false;
        }
        if let Some(code) = exit_code {
            config.sanity.exit_code = *code;
        }
    }

    Ok(config)
}

/// Log to stderr and to a fresh session log file
fn init_logging(log_file: &Path) -> miette::Result<()> {
    match std::fs::remove_file(log_file) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(miette::miette!(
                "Failed to remove old log file '{}': {}",
                log_file.display(),
                e
            ))
        }
    }
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            miette::miette!("Failed to create log directory '{}': {}", parent.display(), e)
        })?;
    }
    let file = std::fs::File::create(log_file)
        .map_err(|e| miette::miette!("Failed to create log file '{}': {}", log_file.display(), e))?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();

    info!(log_file = %log_file.display(), "Logging initialized");
    Ok(())
}
