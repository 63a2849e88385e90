//! 数据模型
//!
//! - 烧录记录：ProvisioningRecord，及配置重置 ConfigReset、状态更新 CompileUpdate / UploadUpdate
//! - 设备侧记录：DeviceRecord、EntityRecord、HistoryRecord

use domain::{BuildResult, ProvisioningStatus, UploadStatus};

/// 设备在线状态。
pub const DEVICE_ONLINE: &str = "online";
pub const DEVICE_OFFLINE: &str = "offline";

/// 烧录记录（每个设备 slug 一条）。
#[derive(Debug, Clone)]
pub struct ProvisioningRecord {
    pub record_id: String,
    pub name: String,
    pub slug: String,
    pub template_id: String,
    pub site_location_id: Option<i64>,
    pub ip_address: Option<String>,
    pub config_yaml: String,
    pub compile_status: ProvisioningStatus,
    pub upload_status: UploadStatus,
    pub firmware_version: Option<String>,
    pub last_build: Option<BuildResult>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// 重新生成配置时对已有记录的重置。
#[derive(Debug, Clone)]
pub struct ConfigReset {
    pub name: String,
    pub template_id: String,
    pub site_location_id: Option<i64>,
    pub config_yaml: String,
    pub updated_at_ms: i64,
}

/// 编译状态更新。
#[derive(Debug, Clone)]
pub struct CompileUpdate {
    pub status: ProvisioningStatus,
    /// 仅编译成功时写入新的固件标识。
    pub firmware_version: Option<String>,
    pub last_build: Option<BuildResult>,
    pub updated_at_ms: i64,
}

/// 烧录状态更新。
#[derive(Debug, Clone)]
pub struct UploadUpdate {
    pub status: UploadStatus,
    pub last_build: Option<BuildResult>,
    pub updated_at_ms: i64,
}

/// 设备记录。
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: String,
    pub slug: String,
    pub device_type: String,
    pub site_location_id: Option<i64>,
    pub ip_address: Option<String>,
    pub status: String,
    pub last_seen_at_ms: Option<i64>,
    pub created_at_ms: i64,
}

/// 实体记录（设备上的一个传感器量）。
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub entity_id: String,
    pub device_id: String,
    pub name: String,
    pub entity_type: String,
    pub unit: Option<String>,
    pub current_value: String,
    pub updated_at_ms: i64,
}

/// 实体值变更历史。
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub history_id: String,
    pub entity_id: String,
    pub old_value: String,
    pub new_value: String,
    pub ts_ms: i64,
}
