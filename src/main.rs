use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use microblog::{
    api::{create_router, AppState},
    config::Config,
    db::{self, SessionRepository},
    error::AppError,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,microblog=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting microblog v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    tracing::info!("Configuration loaded");

    let db = db::connect(&config).await?;
    tracing::info!("Database connected: {}", config.database_url);

    db::migrate(&db).await?;
    tracing::info!("Database migrations completed");

    let state = AppState {
        db: db.clone(),
        config: config.clone(),
    };

    // Spawn background task for session cleanup
    {
        let db_clone = db.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600)); // Every hour
            loop {
                interval.tick().await;
                match SessionRepository::cleanup_expired(&db_clone).await {
                    Ok(removed) => tracing::debug!(removed, "expired sessions cleaned up"),
                    Err(e) => tracing::error!("Session cleanup failed: {}", e),
                }
            }
        });
        tracing::info!("Session cleanup task started (runs hourly)");
    }

    let app = create_router(state);

    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
