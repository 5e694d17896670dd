use agentbooks::axum_http::http_serve;
use agentbooks::config::config_loader;
use agentbooks::infra::record_store::http::HttpRecordStore;
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let stage = config_loader::get_stage();
    info!("Stage: {}", stage);

    let record_store = HttpRecordStore::new(dotenvy_env.record_store.clone())?;
    info!("Record store client has been initialized");

    http_serve::start(Arc::new(dotenvy_env), Arc::new(record_store)).await?;

    Ok(())
}
