//! 积分账本服务
//!
//! 提供余额查询、积分兑换与兑换历史的 REST API。

use std::sync::Arc;

use points_ledger::{
    AppState, EventStore, MIGRATOR, MemoryEventStore, PgEventStore, routes,
};
use points_shared::{
    config::{AppConfig, StorageBackend},
    database::Database,
    observability,
};
use axum::{Json, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("points-ledger-service")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config)?;

    info!("Starting points-ledger-service on {}", config.server_addr());

    // 存储后端按配置选择；PostgreSQL 连接在关闭流程结束后释放
    let mut database = None;
    let store: Arc<dyn EventStore> = match config.storage.backend {
        StorageBackend::Memory => {
            if config.is_production() {
                warn!("生产环境使用内存存储，重启后积分数据将全部丢失");
            }
            warn!("Using in-memory event store, data will be lost on restart");
            Arc::new(MemoryEventStore::new())
        }
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            if config.storage.run_migrations {
                db.run_migrations(&MIGRATOR).await?;
            }
            let pg_store = PgEventStore::new(db.pool().clone())
                .with_statement_timeout(config.ledger.append_timeout());
            database = Some(db);
            Arc::new(pg_store)
        }
    };

    let state = AppState::new(store, &config.ledger);
    info!(
        lock_timeout_ms = config.ledger.lock_timeout_ms,
        append_timeout_ms = config.ledger.append_timeout_ms,
        default_page_size = config.ledger.default_page_size,
        "Ledger services initialized"
    );

    // 积分接口只供内部调用方使用，CORS 保持宽松
    let mut app = routes::build_router(state);
    if let Some(db) = &database {
        let db = db.clone();
        app = app.route("/ready", get(move || readiness_check(db.clone())));
    }
    let app = app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// 就绪检查：检查数据库连接是否可用（仅 postgres 后端注册）
async fn readiness_check(db: Database) -> Json<serde_json::Value> {
    let db_ok = db.health_check().await.is_ok();
    Json(serde_json::json!({
        "status": if db_ok { "ready" } else { "not_ready" },
        "database": db_ok
    }))
}
