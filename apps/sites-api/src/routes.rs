//! 路由定义
//!
//! - 健康检查：/health
//! - 设备模板：/api/esphome/templates/*
//! - 烧录记录与任务：/api/esphome/devices/*
//! - 发现扫描：/api/esphome/discover
//! - 计数器：/api/metrics

use super::AppState;
use super::handlers::*;
use super::request_context;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// 创建 `/api` 下的路由。
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/esphome/templates", get(list_templates))
        .route("/esphome/templates/:template_id", get(get_template))
        .route(
            "/esphome/devices",
            get(list_provisioning).post(create_provisioning),
        )
        .route("/esphome/devices/:record_id", get(get_provisioning))
        .route("/esphome/devices/:record_id/config", get(get_provisioning_config))
        .route("/esphome/devices/:record_id/compile", post(compile_device))
        .route("/esphome/devices/:record_id/upload", post(upload_device))
        .route("/esphome/discover", get(discover_devices))
        .route("/metrics", get(get_metrics))
}

/// 完整应用：路由 + 状态 + 请求上下文中间件。
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", create_api_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // 注入 request_id/trace_id
        .layer(middleware::from_fn(request_context))
}
