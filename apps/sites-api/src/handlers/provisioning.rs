//! 烧录记录与构建任务 handlers
//!
//! - GET /api/esphome/devices - 列出烧录记录
//! - POST /api/esphome/devices - 生成配置、建记录并启动编译
//! - GET /api/esphome/devices/{id} - 状态轮询（含最近一次构建结果）
//! - GET /api/esphome/devices/{id}/config - 生成的配置
//! - POST /api/esphome/devices/{id}/compile - 启动后台编译
//! - POST /api/esphome/devices/{id}/upload - 启动后台烧录
//!
//! 编译/烧录只返回 202；结果通过轮询记录观察。

use crate::AppState;
use crate::utils::response::{bad_request_error, provisioning_error, record_to_dto};
use crate::utils::{normalize_address, normalize_required};
use api_contract::{
    ApiResponse, CreateProvisioningRequest, ProvisioningConfigDto, ProvisioningCreatedDto,
    ProvisioningDto, TaskAcceptedDto, UploadRequest,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::ProvisioningRequest;

pub async fn list_provisioning(State(state): State<AppState>) -> Response {
    match state.provisioning.list_records().await {
        Ok(items) => {
            let data: Vec<ProvisioningDto> = items.into_iter().map(record_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => provisioning_error(err),
    }
}

/// 创建烧录记录
///
/// 同步完成配置生成与落盘（失败直接返回 400），随后在后台启动首次编译。
pub async fn create_provisioning(
    State(state): State<AppState>,
    Json(req): Json<CreateProvisioningRequest>,
) -> Response {
    let name = match normalize_required(req.name, "name") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let template_id = match normalize_required(req.template_id, "type") {
        Ok(value) => value,
        Err(response) => return response,
    };
    let request = ProvisioningRequest {
        name,
        template_id,
        pins: req.pins,
        site_location_id: req.site_location_id,
    };
    match state.provisioning.provision(request).await {
        Ok(outcome) => {
            let data = ProvisioningCreatedDto {
                id: outcome.record.record_id,
                slug: outcome.record.slug,
                config: outcome.config_yaml,
                config_file: outcome.config_file.display().to_string(),
                compile_status: outcome.record.compile_status.as_str().to_string(),
            };
            (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => provisioning_error(err),
    }
}

pub async fn get_provisioning(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Response {
    match state.provisioning.find_record(&record_id).await {
        Ok(record) => (StatusCode::OK, Json(ApiResponse::success(record_to_dto(record)))).into_response(),
        Err(err) => provisioning_error(err),
    }
}

pub async fn get_provisioning_config(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Response {
    match state.provisioning.find_record(&record_id).await {
        Ok(record) => {
            let data = ProvisioningConfigDto {
                id: record.record_id,
                slug: record.slug,
                config: record.config_yaml,
                compile_status: record.compile_status.as_str().to_string(),
            };
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => provisioning_error(err),
    }
}

pub async fn compile_device(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Response {
    match state.provisioning.start_compile(&record_id).await {
        Ok(_task) => accepted(record_id, "compilation started"),
        Err(err) => provisioning_error(err),
    }
}

/// 启动烧录
///
/// 请求体可省略；`address` 为空时使用记录上保存的地址，仍无地址则按策略回退。
pub async fn upload_device(
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    body: Bytes,
) -> Response {
    let req: UploadRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UploadRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(err) => return bad_request_error(format!("invalid body: {err}")),
        }
    };
    let address = match normalize_address(req.address) {
        Ok(value) => value,
        Err(response) => return response,
    };
    match state.provisioning.start_upload(&record_id, address).await {
        Ok(_task) => accepted(record_id, "firmware upload started"),
        Err(err) => provisioning_error(err),
    }
}

fn accepted(id: String, message: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(TaskAcceptedDto {
            id,
            message: message.to_string(),
        })),
    )
        .into_response()
}
