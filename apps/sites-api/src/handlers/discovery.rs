//! 发现扫描 handler
//!
//! - GET /api/esphome/discover?hint=a.b.c.d

use crate::AppState;
use crate::utils::parse_ipv4_hint;
use api_contract::{ApiResponse, DiscoveredHostDto};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, Default, serde::Deserialize)]
pub struct DiscoverQuery {
    hint: Option<String>,
}

/// 扫描 hint（或本机出口地址）所在 /24，扫描本身不会失败。
pub async fn discover_devices(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> Response {
    let hint = match parse_ipv4_hint(query.hint.as_deref()) {
        Ok(hint) => hint,
        Err(response) => return response,
    };
    let data: Vec<DiscoveredHostDto> = state
        .scanner
        .discover(hint)
        .await
        .into_iter()
        .map(|host| DiscoveredHostDto {
            ip: host.ip.to_string(),
            hostname: host.hostname,
            device_info: host.evidence,
        })
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}
