pub mod api; // HTTP gateway: gatekeeper, auth flow, records API
pub mod config;
pub mod db;
pub mod identity; // Identity provider boundary (GoTrue client + mock)
pub mod models;
pub mod pkce;
pub mod role;
pub mod role_cache;
pub mod session; // Cookie-backed session store adapter

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::{EdgePolicy, GatewayConfig};
use crate::identity::{IdentityProvider, SupabaseAuthClient};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Identity provider client: {0}")]
    Provider(#[from] identity::ProviderError),
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Server error: {0}")]
    Server(#[from] api::ServerError),
}

/// Install the global tracing subscriber (`RUST_LOG`, else the default filter).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Run the gateway until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    init_tracing();

    let config = GatewayConfig::from_env()?;
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    if matches!(config.edge_policy, EdgePolicy::DashboardBypass) {
        tracing::warn!(
            policy = config.edge_policy.as_str(),
            "edge session check disabled for /dashboard; pages there must check the session themselves"
        );
    }

    let provider: Arc<dyn IdentityProvider> = Arc::new(SupabaseAuthClient::from_config(&config)?);

    let conn = match &config.database_path {
        Some(path) => db::open_database(path)?,
        None => {
            tracing::warn!("CARELINK_DATABASE_PATH not set, records are kept in memory");
            db::open_memory_database()?
        }
    };

    let ctx = api::ApiContext::new(config, provider, conn);
    let mut server = api::start_server(ctx).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
