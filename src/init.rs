//! Initialization helpers for the application startup.

use crate::config::Config;
use crate::engine::{ReconcileOptions, Reconciler};
use crate::error::SyncResult;
use crate::fetcher::HttpSourceFetcher;
use crate::remote::GatewayClient;
use std::sync::Arc;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Suppress HTTP stack internals unless explicitly enabled/overridden
        if !filter.contains("hyper") {
            filter.push_str(",hyper=off,hyper_util=off");
        }
        if !filter.contains("reqwest") {
            filter.push_str(",reqwest=warn");
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Builds the gateway client shared by the update and cleanup jobs.
pub fn init_client(config: &Config) -> SyncResult<Arc<GatewayClient>> {
    Ok(Arc::new(GatewayClient::from_config(config)?))
}

/// Wires the HTTP client and fetcher into a [`Reconciler`].
pub fn init_reconciler(
    config: &Config,
    client: Arc<GatewayClient>,
    dry_run: bool,
) -> SyncResult<Reconciler> {
    let fetcher = Arc::new(HttpSourceFetcher::new(config.request_timeout())?);
    let options = ReconcileOptions {
        dry_run,
        ..ReconcileOptions::from_config(config)
    };
    Ok(Reconciler::new(client, fetcher, options))
}
