//! Kitty War server binary.
//!
//! Configuration comes from the environment:
//!
//! - `KITTYWAR_BIND`: listen address (default `0.0.0.0:2056`)
//! - `KITTYWAR_CATALOG`: path to a card catalog JSON file (default: the
//!   built-in catalog)
//! - `KITTYWAR_PROFILES`: path to a JSON array of accounts for the
//!   in-memory store (default: no accounts)
//! - `RUST_LOG`: log filter (default `info`)

use std::path::Path;

use kittywar::prelude::*;
use tokio::signal;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), KittyWarError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();

    let bind = std::env::var("KITTYWAR_BIND").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let mut builder = KittyWarServerBuilder::new().bind(&bind);
    if let Some(path) = env_path("KITTYWAR_CATALOG") {
        let catalog = CardCatalog::from_json(&read_file(&path).await?)?;
        tracing::info!(path = %path, "loaded card catalog");
        builder = builder.catalog(catalog);
    }

    let store = match env_path("KITTYWAR_PROFILES") {
        Some(path) => {
            let store = MemoryProfileStore::from_json(&read_file(&path).await?)?;
            tracing::info!(path = %path, accounts = store.len().await, "loaded accounts");
            store
        }
        None => {
            tracing::warn!("KITTYWAR_PROFILES not set, no account can log in");
            MemoryProfileStore::new()
        }
    };

    let server = builder.build(store).await?;

    let result = server
        .run_until(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown signal received");
        })
        .await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "server stopped");
    }
    result
}

fn env_path(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

async fn read_file(path: impl AsRef<Path>) -> Result<String, KittyWarError> {
    Ok(tokio::fs::read_to_string(path).await?)
}
