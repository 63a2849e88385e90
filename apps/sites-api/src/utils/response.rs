//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：bad_request_error, not_found_error, provisioning_error
//! - DTO 转换：template_to_dto, record_to_dto
//!
//! 所有错误返回统一的 ApiResponse 格式，HTTP 状态码与错误码对应。

use api_contract::{ApiResponse, BuildResultDto, PinDto, ProvisioningDto, TemplateDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::{BuildResult, DeviceTemplate};
use sites_generator::GenerateError;
use sites_provisioning::ProvisioningError;
use sites_storage::ProvisioningRecord;

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 资源忙（同一设备已有构建任务）
pub fn busy_error(message: impl Into<String>) -> Response {
    (
        StatusCode::CONFLICT,
        Json(ApiResponse::<()>::error("RESOURCE.BUSY", message.into())),
    )
        .into_response()
}

/// 内部错误响应
pub fn internal_error(message: impl Into<String>) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message.into())),
    )
        .into_response()
}

/// 烧录错误映射到状态码
pub fn provisioning_error(err: ProvisioningError) -> Response {
    match err {
        ProvisioningError::NotFound(_) => not_found_error(),
        ProvisioningError::Busy(_) => busy_error(err.to_string()),
        ProvisioningError::ConfigNotFound(_)
        | ProvisioningError::NotCompiled(_)
        | ProvisioningError::AddressRequired => bad_request_error(err.to_string()),
        ProvisioningError::Generate(
            GenerateError::Render(_) | GenerateError::Io { .. },
        ) => {
            tracing::error!(target: "sites.api", "config persistence failed: {}", err);
            internal_error(err.to_string())
        }
        ProvisioningError::Generate(_) => bad_request_error(err.to_string()),
        ProvisioningError::Storage(_) => internal_error(err.to_string()),
    }
}

/// DeviceTemplate 转 TemplateDto
pub fn template_to_dto(template: &DeviceTemplate) -> TemplateDto {
    TemplateDto {
        template_id: template.id.clone(),
        name: template.name.clone(),
        description: template.description.clone(),
        sensors: template.sensors.clone(),
        pins: template
            .pins
            .iter()
            .map(|pin| PinDto {
                role: pin.role.clone(),
                kind: pin.kind.as_str().to_string(),
                default: pin.default.clone(),
                required: pin.required,
            })
            .collect(),
    }
}

fn build_to_dto(build: BuildResult) -> BuildResultDto {
    BuildResultDto {
        success: build.success,
        stdout: build.stdout,
        stderr: build.stderr,
        exit_code: build.exit_code,
        timed_out: build.timed_out,
    }
}

/// ProvisioningRecord 转 ProvisioningDto
pub fn record_to_dto(record: ProvisioningRecord) -> ProvisioningDto {
    ProvisioningDto {
        id: record.record_id,
        name: record.name,
        slug: record.slug,
        template_id: record.template_id,
        site_location_id: record.site_location_id,
        ip_address: record.ip_address,
        compile_status: record.compile_status.as_str().to_string(),
        upload_status: record.upload_status.as_str().to_string(),
        firmware_version: record.firmware_version,
        last_build: record.last_build.map(build_to_dto),
        created_at: record.created_at_ms,
        updated_at: record.updated_at_ms,
    }
}
