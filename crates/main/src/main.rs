//! 主应用程序入口
//!
//! 加载配置、初始化日志、按配置选择存储后端，然后启动 Axum Web API 服务。

use std::sync::Arc;

use application::{RoomService, RoomServiceDependencies, SystemClock};
use config::AppConfig;
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，未设置 RUST_LOG 时默认 info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        backend = ?config.store.backend,
        capacity = config.room.max_capacity,
        base_ttl = config.room.base_ttl_seconds,
        "配置加载完成"
    );

    // 存储与发布订阅适配器
    let infra = Infrastructure::connect(&config).await?;

    let room_service = RoomService::new(RoomServiceDependencies {
        store: infra.store.clone(),
        publisher: infra.publisher.clone(),
        clock: Arc::new(SystemClock),
        room_config: config.room.clone(),
        rate_limit_config: config.rate_limit.clone(),
    });

    let state = AppState::new(Arc::new(room_service), infra.subscriber.clone());

    // 启动 Web 服务器
    let app = router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天服务启动在 http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "无法监听退出信号");
    }
}
