//! Watchroom 동기화 서버 실행 진입점

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watchroom_sync::persistence::{MemoryQueueMirror, QueueMirror, SqliteQueueMirror};
use watchroom_sync::{server, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 큐 영속화
    let mirror: Arc<dyn QueueMirror> = match &config.database.url {
        Some(url) => {
            Arc::new(SqliteQueueMirror::connect(url, config.database.max_connections).await?)
        }
        None => {
            tracing::info!("DATABASE_URL not set, queues are mirrored in memory only");
            Arc::new(MemoryQueueMirror::new())
        }
    };

    let state = Arc::new(AppState::new(config.clone(), mirror));
    let app = server::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Watchroom sync server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
