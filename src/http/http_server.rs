use crate::backend::client::BackendClient;
use crate::config::{AppConfig, SessionBackend};
use crate::session::{memory::MemoryStore, redis::RedisStore, SessionStore};
use crate::{http::routes::create_routes, state::{AppState, SharedState}};
use anyhow::anyhow;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tracing::info;

use deadpool_redis::{Config as RedisConfig, Runtime};

pub async fn start_http_server(
    config: AppConfig,
    shutdown_rx: watch::Receiver<()>,
) -> Result<
    JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>,
    Box<dyn std::error::Error + Send + Sync>,
> {
    let http_addr = format!("{}:{}", config.http.address, config.http.port);
    let listener = tokio::net::TcpListener::bind(http_addr.clone()).await?;
    info!("🚀 Starting seat-predictor gateway on {:?}", http_addr);

    let sessions = build_session_store(&config).await?;
    let backend = Arc::new(BackendClient::new(&config.backend.base_url));
    info!("✅ Backend base URL: {}", config.backend.base_url);

    let app_state = AppState {
        config: Arc::new(config),
        sessions,
        backend,
        shared_state: SharedState::default(),
    };

    let http_server = tokio::spawn(run_http_server(listener, shutdown_rx, app_state));

    Ok(http_server)
}

async fn build_session_store(
    config: &AppConfig,
) -> Result<Arc<dyn SessionStore>, Box<dyn std::error::Error + Send + Sync>> {
    match config.session.backend {
        SessionBackend::Memory => {
            info!("✅ Using in-memory session store");
            Ok(Arc::new(MemoryStore::new(config.session.ttl_secs)))
        }
        SessionBackend::Redis => {
            let url = config
                .session
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow!("session.redis_url required for the redis backend"))?;
            let redis_cfg = RedisConfig::from_url(url);
            let pool = redis_cfg.create_pool(Some(Runtime::Tokio1))?;

            // Fail fast on a dead Redis rather than on the first visitor.
            {
                let mut conn = pool.get().await?;
                let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                info!("✅ Redis PING -> {}", pong);
            }

            Ok(Arc::new(RedisStore::new(pool, config.session.ttl_secs)))
        }
    }
}

pub async fn run_http_server(
    listener: TcpListener,
    mut shutdown_rx: watch::Receiver<()>,
    app_state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_routes(app_state);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_rx.changed().await.ok();
            tracing::info!("🚦 Gracefully shutting down all connections");
        })
        .await?;

    Ok(())
}
