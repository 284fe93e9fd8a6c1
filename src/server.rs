use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::app::{router, AppState, Repository};
use crate::config::{AppConfig, Environment};
use crate::database::{DatabaseManager, MemoryStore, PgStore};

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, embedded use) is harmless.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Pick the backing store: Postgres when a URL is configured, the in-memory
/// store when asked for or when running in development without a database.
pub async fn build_repository(config: &AppConfig, in_memory: bool) -> anyhow::Result<Arc<Repository>> {
    if in_memory {
        tracing::warn!("using in-memory store; data is lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    match &config.database.url {
        Some(_) => {
            let pool = DatabaseManager::connect(&config.database)
                .await
                .context("connecting to database")?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        None if config.environment == Environment::Development => {
            tracing::warn!("DATABASE_URL not set; falling back to in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        None => anyhow::bail!("DATABASE_URL is required outside development"),
    }
}

/// Bind, serve until ctrl-c, then cancel in-flight requests.
pub async fn serve(config: AppConfig, in_memory: bool) -> anyhow::Result<()> {
    config.validate()?;
    let port = config.server.port;
    tracing::info!("Starting Org Hierarchy API in {:?} mode", config.environment);

    let repo = build_repository(&config, in_memory).await?;
    let state = AppState::new(config, repo)?;
    let shutdown = state.shutdown.clone();
    let app = router(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("shutdown requested");
            shutdown.cancel();
        })
        .await
        .context("server error")?;
    Ok(())
}
