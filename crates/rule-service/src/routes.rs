//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use rules_shared::observability::middleware as obs_middleware;
use tower_http::trace::TraceLayer;

use crate::{handlers, state::AppState};

/// 构建规则相关的路由
pub fn rule_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/rules",
            post(handlers::rule::create_rule).get(handlers::rule::list_rules),
        )
        .route("/api/rules/combine", post(handlers::rule::combine_rules))
        .route("/api/rules/evaluate", post(handlers::rule::evaluate_rules))
        .route("/api/rules/rules/{id}", delete(handlers::rule::delete_rule))
}

/// 构建运维探针路由
fn probe_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
}

/// 构建完整应用
///
/// 中间件从外到内：请求 ID、请求追踪与指标、HTTP trace。
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(rule_routes())
        .merge(probe_routes())
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
