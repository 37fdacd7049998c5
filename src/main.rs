// src/main.rs
use carrier_fit::api;
use carrier_fit::config::AppConfig;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let dotenv_outcome = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = dotenv_outcome {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!("⚠️ Could not load .env: {}", err);
        }
    }

    let app_config = AppConfig::from_env();
    let api_config = app_config.api.clone();
    let allocation = app_config.engine.allocation_config();
    let carriers = app_config.catalog.load_carriers();

    info!(
        catalog = ?app_config.catalog.path(),
        carriers = carriers.len(),
        "🚀 Carrier fit service starting..."
    );
    api::start_api_server(api_config, allocation, carriers).await;
}
