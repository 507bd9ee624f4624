//! CoE panel host
//!
//! Usage: `coe-server [CONFIG_DIR]`. Loads `coe.yaml` and the stored config
//! entries from CONFIG_DIR (default `.`), migrates legacy CoE entries and
//! serves the websocket API until interrupted.

use anyhow::{Context, Result};
use coe_api::{create_router, AppState};
use coe_config::PanelConfig;
use coe_config_entries::{migrate_entry, ConfigEntries, Storage};
use coe_core::{ATTR_UNIT_OF_MEASUREMENT, DOMAIN};
use coe_state_store::StateStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Everything the websocket API serves
pub struct CoeHost {
    pub config: PanelConfig,
    pub config_entries: Arc<ConfigEntries>,
    pub states: Arc<StateStore>,
}

impl CoeHost {
    /// Load configuration, entries and seed states from a config directory
    pub async fn load(config_dir: &Path) -> Result<Self> {
        let config = PanelConfig::load(config_dir)
            .with_context(|| format!("loading configuration from {}", config_dir.display()))?;

        let config_entries = Arc::new(ConfigEntries::new(Arc::new(Storage::new(config_dir))));
        config_entries
            .load()
            .await
            .context("loading config entries")?;

        for entry in config_entries.get_by_domain(DOMAIN) {
            if !migrate_entry(&config_entries, &entry.entry_id).await? {
                warn!(
                    "Config entry {} ({}) is from a newer version {}.{}",
                    entry.title, entry.entry_id, entry.version, entry.minor_version
                );
            }
        }

        let states = Arc::new(StateStore::new());
        for seed in &config.entities {
            let mut attributes = HashMap::new();
            if let Some(unit) = &seed.unit_of_measurement {
                attributes.insert(
                    ATTR_UNIT_OF_MEASUREMENT.to_string(),
                    serde_json::Value::String(unit.clone()),
                );
            }
            states.set(seed.entity_id.clone(), seed.state.clone(), attributes);
        }

        info!(
            "Loaded {} config entries and {} entity states",
            config_entries.len(),
            states.entity_count()
        );

        Ok(Self {
            config,
            config_entries,
            states,
        })
    }

    pub fn app_state(&self) -> AppState {
        let state = AppState::new(self.config_entries.clone(), self.states.clone());
        match &self.config.server.access_token {
            Some(token) => state.with_access_token(token.as_str()),
            None => state,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    info!("Starting CoE panel host (config: {})", config_dir.display());

    let host = CoeHost::load(&config_dir).await?;
    if host.config.server.access_token.is_none() {
        warn!("No server.access_token configured, accepting any token");
    }

    let bind = host.config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, create_router(host.app_state()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down...");
        })
        .await?;

    Ok(())
}
