use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use gateway_sync::config::{Config, Overrides};
use gateway_sync::engine::cleanup_sources;
use gateway_sync::init::{init_client, init_reconciler, setup_logging};
use gateway_sync::remote::GatewayClient;
use gateway_sync::versions::VersionStore;

#[derive(Parser, Debug)]
#[command(name = "gateway-sync", version, about)]
struct Cli {
    /// Optional TOML config; built-in defaults are used when it does not exist.
    #[arg(short, long, default_value = "gateway-sync.toml")]
    config: PathBuf,

    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true, global = true)]
    api_token: Option<String>,

    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID", global = true)]
    account_id: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT", global = true)]
    request_timeout: Option<u64>,

    /// Update every source regardless of its version.
    #[arg(long, env = "FORCE_UPDATE_ALL", global = true, value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    force_update_all: Option<bool>,

    #[arg(long, env = "CHECK_VERSIONS", global = true, value_parser = BoolishValueParser::new())]
    check_versions: Option<bool>,

    /// Path of the version cache file.
    #[arg(long, global = true)]
    version_cache: Option<String>,

    /// Only report which sources would be updated.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Reconcile remote lists and policies with the blocklists (default).
    Update,
    /// Delete every list and policy this tool manages.
    Cleanup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 1. Load Config
    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // 2. Setup Logging
    setup_logging(&config);

    // 3. Run
    match run(cli.command.unwrap_or(Command::Update), cli.dry_run, config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if cli.config.exists() {
        Config::load(&cli.config).await?
    } else {
        Config::default()
    };

    config.apply_overrides(Overrides {
        api_token: cli.api_token.clone(),
        account_id: cli.account_id.clone(),
        request_timeout_secs: cli.request_timeout,
        force_update_all: cli.force_update_all,
        check_versions: cli.check_versions,
        version_cache_path: cli.version_cache.clone(),
    });
    config.validate()?;
    Ok(config)
}

async fn run(command: Command, dry_run: bool, config: Config) -> Result<u8> {
    let client = init_client(&config).context("Failed to build API client")?;

    match command {
        Command::Cleanup => {
            info!("Starting gateway cleanup...");
            let summary = cleanup_sources(client.as_ref(), &config.sources)
                .await
                .context("Failed to fetch initial data")?;
            summary.log();
            Ok(summary.exit_code() as u8)
        }
        Command::Update => update(config, client, dry_run).await,
    }
}

async fn update(
    config: Config,
    client: Arc<GatewayClient>,
    dry_run: bool,
) -> Result<u8> {
    info!("Starting gateway blocklist update with version tracking...");
    info!(
        "Force update all: {}",
        if config.updates.force_update_all { "YES" } else { "NO" }
    );
    info!(
        "Check versions: {}",
        if config.updates.check_versions { "ENABLED" } else { "DISABLED" }
    );

    let mut versions = VersionStore::load(&config.updates.version_cache_path).await;
    if versions.is_empty() {
        info!("No version cache found (first run or cache deleted)");
    } else {
        info!("Loaded {} cached versions", versions.len());
    }

    let reconciler =
        init_reconciler(&config, client, dry_run).context("Failed to build reconciler")?;
    let summary = reconciler
        .run(&config.sources, &mut versions)
        .await
        .context("Reconciliation aborted")?;

    summary.log();
    Ok(summary.exit_code() as u8)
}
