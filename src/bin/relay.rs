use std::sync::Arc;

use anyhow::{Context, Result};
use makeup_mirror::{
    config::{RelayConfig, StoreKind},
    relay::{self, GcsStore, MemoryStore, RelayState},
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = RelayConfig::from_env()?;
    log::info!("starting relay with {:?} store on port {}", config.store, config.port);

    let state: RelayState = match (&config.store, config.gcs) {
        (StoreKind::Gcs, Some(credentials)) => Arc::new(GcsStore::new(credentials)?),
        (StoreKind::Gcs, None) => anyhow::bail!("GCS store selected without credentials"),
        (StoreKind::Memory, _) => Arc::new(MemoryStore::new(config.bucket)),
    };

    relay::run_server(config.port, state)
        .await
        .with_context(|| format!("relay failed on port {}", config.port))
}
