//! Tenant API server entry point.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the store, provider client and HTTP router
//! 5. Start server on configured port

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tenant_api_server::{
    AppState, build_router,
    config::{AuthSettings, Config},
    db::{self, PgAuthStore},
    services::provider::ProviderClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG, defaults to "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let settings = AuthSettings::from_config(&config)?;
    tracing::info!(realm = %settings.realm, "Configuration loaded");

    let pool = db::create_pool(
        &config.database_url,
        config.db_max_connections,
        config.db_acquire_timeout(),
    )
    .await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let provider = ProviderClient::new(&config)?;
    let state = AppState::new(
        Arc::new(PgAuthStore::new(pool)),
        Arc::new(provider),
        settings,
    );
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
