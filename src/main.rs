mod app;
mod domain;
mod infrastructure;

use anyhow::Result;
use tracing::info;

use crate::domain::settings::{ConfigStore, SharedConfig};
use crate::infrastructure::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let store = ConfigStore::load()?;
    let _logging_guard = logging::init_logger(&store.config().log)?;

    info!("Starting CTS time synchronizer");
    info!("configuration loaded from {}", store.path().display());
    match &store.config().last_device {
        Some(device) => info!("remembered target device: {device}"),
        None => info!("no target device remembered yet"),
    }

    app::run(SharedConfig::new(store)).await?;
    info!("shutdown complete");
    Ok(())
}
