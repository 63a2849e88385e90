//! 设备模板 handlers
//!
//! - GET /api/esphome/templates - 列出内置模板（按目录声明顺序）
//! - GET /api/esphome/templates/{type} - 获取单个模板

use crate::AppState;
use crate::utils::response::{not_found_error, template_to_dto};
use api_contract::{ApiResponse, TemplateDto};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn list_templates(State(state): State<AppState>) -> Response {
    let data: Vec<TemplateDto> = state
        .provisioning
        .templates()
        .iter()
        .map(template_to_dto)
        .collect();
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub async fn get_template(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> Response {
    match state.provisioning.template(&template_id) {
        Some(template) => (
            StatusCode::OK,
            Json(ApiResponse::success(template_to_dto(template))),
        )
            .into_response(),
        None => not_found_error(),
    }
}
