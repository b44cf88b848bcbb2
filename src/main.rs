//! Nodetop - live terminal dashboard for a monitored server fleet
//!
//! Shows the node inventory of a monitoring API as a table and live CPU,
//! memory and disk charts for the selected node, refreshed in the background.

mod config;
mod core;
mod integrations;
mod metrics;
mod pollers;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::core::app::App;
use crate::integrations::api::{FleetApi, HttpFleetClient, Node};

const PLAIN_TABLE_WIDTH: u16 = 100;

#[derive(Parser)]
#[command(name = "nodetop")]
#[command(version)]
#[command(about = "Live terminal dashboard for a monitored server fleet", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Monitoring API base URL
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// API token sent as a bearer credential
    #[arg(long, env = "NODETOP_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Seconds between node list refreshes
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    inventory_interval: Option<u64>,

    /// Seconds between metric refreshes for the selected node
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    metrics_interval: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Print the node inventory once and exit
    Nodes,
}

fn setup_logging(verbosity: u8) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout belongs to the dashboard, so logs only go to a file
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nodetop")
        .join("logs");

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "nodetop.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

/// Command line flags win over the configuration file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.url {
        config.api.url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.api.token = Some(token.clone());
    }
    if let Some(secs) = cli.inventory_interval {
        config.refresh.inventory_interval_secs = secs;
    }
    if let Some(secs) = cli.metrics_interval {
        config.refresh.metrics_interval_secs = secs;
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli
        .config
        .clone()
        .or_else(|| Config::default_path().filter(|path| path.exists()));

    let mut config = if let Some(path) = config_path {
        Config::load(&path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        Config::default()
    };
    apply_overrides(&mut config, cli);
    Ok(config)
}

/// One inventory call before the terminal is taken over
async fn validate_credentials(client: &dyn FleetApi) -> Result<Vec<Node>> {
    client
        .fetch_nodes()
        .await
        .context("Invalid API URL or token provided")
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Init { force }) = &cli.command {
        let path = cli
            .config
            .clone()
            .or_else(Config::default_path)
            .context("Cannot determine a configuration directory, pass --config")?;
        return config::init_config(&path, *force);
    }

    let config = load_config(&cli)?;
    let client: Arc<dyn FleetApi> = Arc::new(HttpFleetClient::new(&config.api)?);
    let nodes = validate_credentials(client.as_ref()).await?;
    tracing::info!(count = nodes.len(), url = %config.api.url, "credentials accepted");

    match cli.command {
        Some(Commands::Nodes) => {
            let width = crossterm::terminal::size()
                .map(|(width, _)| width)
                .unwrap_or(PLAIN_TABLE_WIDTH);
            for line in ui::layout::plain_table(&nodes, width) {
                println!("{}", line);
            }
        }
        // handled before the config is loaded
        Some(Commands::Init { .. }) => {}
        None => {
            App::new(config, client, nodes)?.run().await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Keep the guard alive for the duration of the program
    let _logging_guard = match setup_logging(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("logging disabled: {:#}", e);
            None
        }
    };

    if let Err(e) = run(cli).await {
        tracing::error!("exiting: {:#}", e);
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
