use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use trialscout::api::server::start_server;
use trialscout::api::types::ApiContext;
use trialscout::config::{self, AppConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let app_config = AppConfig::from_env();
    tracing::info!("TrialScout starting v{}", config::APP_VERSION);
    if app_config.gemini_api_key.is_none() {
        tracing::warn!(
            "GEMINI_API_KEY not set; semantic extraction disabled, pattern extraction only"
        );
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    let ctx = ApiContext::new(app_config);

    let mut server = match start_server(ctx, addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
}
