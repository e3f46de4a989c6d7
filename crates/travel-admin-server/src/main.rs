//! Travel admin backend.
//!
//! Runs the proxy server by default. `--probe` instead walks the data
//! gateway against the configured backend and prints what it found.
//! `--store-secret` / `--forget-secret` manage the app secret in the OS
//! keychain.

use std::io;

use anyhow::{bail, Result};
use serde_json::json;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use travel_admin_core::auth::CredentialStore;
use travel_admin_core::{Collection, Config, DataGateway, Stats};
use travel_admin_server::ServerConfig;

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "info";

/// Directory for daily log files; unset means stderr only
const ENV_LOG_DIR: &str = "TRAVEL_ADMIN_LOG_DIR";

const LOG_FILE_PREFIX: &str = "travel-admin.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--probe" {
        return probe().await;
    }
    if args.len() > 1 && args[1] == "--store-secret" {
        return store_secret();
    }
    if args.len() > 1 && args[1] == "--forget-secret" {
        return forget_secret();
    }

    let config = ServerConfig::from_env()?;
    info!(port = config.port, "Travel admin backend starting");
    travel_admin_server::serve(config).await
}

/// Fetch every collection through the gateway and print the tiers that
/// answered, the resulting counts and the state of the local store.
async fn probe() -> Result<()> {
    let config = Config::load()?;
    let gateway = DataGateway::from_config(&config).await?;

    let connection = gateway.test_connection().await;

    let mut stats = Stats::default();
    let mut collections = Vec::new();
    for collection in Collection::ALL {
        let outcome = gateway.fetch(collection, json!({})).await;
        stats.set(collection, outcome.items.len());
        collections.push(json!({
            "collection": collection,
            "tier": outcome.tier,
            "count": outcome.items.len(),
            "notice": outcome.notice(),
            "failures": outcome.failures,
        }));
    }

    let summary = gateway.store().summary();
    let token = gateway.tokens().cached_token().await;

    let report = json!({
        "backend": config.backend_url(),
        "envId": config.env_id(),
        "connection": connection,
        "connected": gateway.is_connected(),
        "tokenExpiresIn": token.map(|t| t.seconds_until_expiry()),
        "collections": collections,
        "stats": stats,
        "store": {
            "lastUpdated": summary.last_updated(),
            "anyStale": summary.any_stale(),
            "entries": summary.entries,
        },
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn configured_app_id() -> Result<String> {
    let config = Config::load()?;
    match config.app_id {
        Some(app_id) if !app_id.is_empty() => Ok(app_id),
        _ => bail!("No app id configured; set TRAVEL_ADMIN_APP_ID or app_id in config.json"),
    }
}

/// Read the app secret from stdin and keep it in the OS keychain.
fn store_secret() -> Result<()> {
    let app_id = configured_app_id()?;
    eprint!("App secret for {}: ", app_id);

    let mut secret = String::new();
    io::stdin().read_line(&mut secret)?;
    let secret = secret.trim();
    if secret.is_empty() {
        bail!("No secret entered");
    }

    CredentialStore::store(&app_id, secret)?;
    eprintln!("Stored app secret in the OS keychain");
    Ok(())
}

fn forget_secret() -> Result<()> {
    let app_id = configured_app_id()?;
    CredentialStore::delete(&app_id)?;
    eprintln!("Removed app secret for {} from the OS keychain", app_id);
    Ok(())
}
