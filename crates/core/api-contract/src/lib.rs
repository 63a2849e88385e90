//! 稳定的 DTO 与 API 响应契约。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 健康检查返回结构。
#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub ok: bool,
}

/// 模板引脚定义。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinDto {
    pub role: String,
    pub kind: String,
    pub default: String,
    pub required: bool,
}

/// 设备模板返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDto {
    #[serde(rename = "type")]
    pub template_id: String,
    pub name: String,
    pub description: String,
    pub sensors: Vec<String>,
    pub pins: Vec<PinDto>,
}

/// 设备烧录请求体。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProvisioningRequest {
    pub name: String,
    #[serde(rename = "type", alias = "templateId")]
    pub template_id: String,
    #[serde(default)]
    pub pins: BTreeMap<String, String>,
    #[serde(alias = "site_location_id")]
    pub site_location_id: Option<i64>,
}

/// 烧录请求受理结果：记录 id、slug 与生成的配置。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningCreatedDto {
    pub id: String,
    pub slug: String,
    pub config: String,
    pub config_file: String,
    pub compile_status: String,
}

/// 工具链调用结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResultDto {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// 烧录记录返回结构（状态轮询）。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningDto {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub template_id: String,
    pub site_location_id: Option<i64>,
    pub ip_address: Option<String>,
    pub compile_status: String,
    pub upload_status: String,
    pub firmware_version: Option<String>,
    pub last_build: Option<BuildResultDto>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 配置查询返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningConfigDto {
    pub id: String,
    pub slug: String,
    pub config: String,
    pub compile_status: String,
}

/// 烧录（上传）请求体。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(alias = "ip_address", alias = "ipAddress")]
    pub address: Option<String>,
}

/// 后台任务受理响应。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAcceptedDto {
    pub id: String,
    pub message: String,
}

/// 发现结果。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredHostDto {
    pub ip: String,
    pub hostname: Option<String>,
    pub device_info: String,
}

/// 进程计数器快照。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub provision_requests: u64,
    pub compile_started: u64,
    pub compile_success: u64,
    pub compile_failure: u64,
    pub compile_timeout: u64,
    pub upload_started: u64,
    pub upload_success: u64,
    pub upload_failure: u64,
    pub upload_timeout: u64,
    pub build_duration_ms_total: u64,
    pub build_duration_ms_count: u64,
    pub devices_materialized: u64,
    pub discovery_probes: u64,
    pub discovery_matches: u64,
    pub telemetry_messages: u64,
    pub telemetry_dropped: u64,
    pub telemetry_lookup_miss: u64,
    pub telemetry_history_appended: u64,
}
