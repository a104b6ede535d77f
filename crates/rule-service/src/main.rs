//! 规则服务
//!
//! 提供规则创建、合并、删除与评估的 REST API。

use std::sync::Arc;

use axum::http::HeaderValue;
use rule_engine::ParseMode;
use rule_service::{
    AppState, MemoryRuleRepository, PgRuleRepository, RuleRepository, routes::build_app,
};
use rules_shared::{
    config::{AppConfig, StorageBackend},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "rule-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    let (repository, database): (Arc<dyn RuleRepository>, Option<Database>) =
        match config.storage.backend {
            StorageBackend::Postgres => {
                let db = Database::connect(&config.database).await?;
                if config.database.run_migrations {
                    db.run_migrations().await?;
                }
                (Arc::new(PgRuleRepository::new(db.clone())), Some(db))
            }
            StorageBackend::Memory => {
                warn!("使用内存存储，重启后规则将丢失");
                (Arc::new(MemoryRuleRepository::new()), None)
            }
        };

    let mode = if config.rules.strict_parsing {
        ParseMode::Strict
    } else {
        ParseMode::Lenient
    };
    info!(?mode, backend = ?config.storage.backend, "Rule service configured");

    let state = AppState::new(repository, mode);
    let app = build_app(state).layer(cors_layer(&config));

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

/// CORS 配置：通过 RULES_CORS_ORIGINS 环境变量控制允许的来源
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed_origins = std::env::var("RULES_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    if allowed_origins == "*" {
        if config.is_production() {
            warn!("RULES_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("注册 Ctrl+C 处理器失败: {}", e);
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
                warn!("注册 SIGTERM 处理器失败: {}", e);
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
