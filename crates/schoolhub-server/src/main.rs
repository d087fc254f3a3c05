mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use schoolhub_api::{AppState, AppStateInner};
use schoolhub_gateway::{ConnectionRegistry, Hub};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "schoolhub=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database
    let db = Arc::new(schoolhub_db::Database::open(&config.db_path)?);

    if let Some((login, password)) = &config.director_seed {
        schoolhub_api::auth::seed_director(&db, login, password)?;
    }

    // Shared state: one registry for the lifetime of the process
    let hub = Hub::new(db, ConnectionRegistry::new(), config.jwt_secret.clone());
    let state: AppState = Arc::new(AppStateInner {
        hub,
        token_ttl: config.token_ttl,
    });

    let app = schoolhub_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Schoolhub server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
