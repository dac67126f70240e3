use std::path::Path;
use std::sync::Arc;

use scanbridge_core::config::AppConfig;
use scanbridge_core::handlers::Gateway;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path =
        std::env::var("SCANBRIDGE_CONFIG").unwrap_or_else(|_| "scanbridge.toml".to_string());
    let config = AppConfig::load(Some(Path::new(&config_path)))?;
    if config.auth.require_api_key && config.auth.api_keys.is_empty() {
        tracing::warn!("auth.api_keys is empty, every API request will be rejected");
    }

    let address = config.listen.address.clone();
    let gateway = Arc::new(Gateway::from_config(config));
    let listener = TcpListener::bind(&address).await?;
    tracing::info!(%address, "scanbridge listening");
    axum::serve(listener, scanbridge_server::app(gateway)).await?;
    Ok(())
}
