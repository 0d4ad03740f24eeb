//! Idlecraft scheduler host
//!
//! Opens the durable store, installs the catalog, registers the configured
//! seed users and then runs the generation and crafting sweeps on their own
//! intervals until Ctrl+C.
//!
//! Usage:
//!   idlecraft-server [config/server.ron]
//!
//! `RUST_LOG` overrides the configured log filter.

mod config;
mod scheduler;

use config::ServerConfig;
use idlecraft_core::{Engine, ErrorKind};
use idlecraft_db::Store;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.ron".to_string());
    let config = ServerConfig::load(&config_path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(path = %config_path, "configuration loaded");

    let store = Store::open(&config.database_path)?;
    let engine = Arc::new(Engine::new(store, config.engine.clone()));

    let catalog = idlecraft_script::load_catalog(&config.catalog_path)?;
    engine.install_catalog(&catalog)?;

    for new_user in &config.seed_users {
        match engine.create_user(new_user) {
            Ok(user) => info!(user = %user.id, username = %user.username, "seed user registered"),
            Err(e) if e.kind() == ErrorKind::Conflict => {
                debug!(username = %new_user.username, "seed user already present")
            }
            Err(e) => return Err(e.into()),
        }
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let generation = {
        let engine = engine.clone();
        tokio::spawn(scheduler::run_periodic(
            "generation",
            config.generation_interval(),
            shutdown_rx.clone(),
            move || engine.run_generation_tick(),
        ))
    };
    let crafting = {
        let engine = engine.clone();
        tokio::spawn(scheduler::run_periodic(
            "crafting",
            config.crafting_interval(),
            shutdown_rx,
            move || engine.run_crafting_reconcile(),
        ))
    };

    info!("server started, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    shutdown_tx.send(true)?;
    generation.await?;
    crafting.await?;

    Ok(())
}
