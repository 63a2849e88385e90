//! 存储接口 Trait 定义
//!
//! - ProvisioningStore：烧录记录
//! - DeviceStore：设备
//! - EntityStore：实体当前值
//! - HistoryStore：实体值变更历史

use crate::error::StorageError;
use crate::models::{
    CompileUpdate, ConfigReset, DeviceRecord, EntityRecord, HistoryRecord, ProvisioningRecord,
    UploadUpdate,
};
use async_trait::async_trait;

/// 烧录记录存储接口。
///
/// 状态字段只由构建编排器的后台任务修改。
#[async_trait]
pub trait ProvisioningStore: Send + Sync {
    async fn create_record(
        &self,
        record: ProvisioningRecord,
    ) -> Result<ProvisioningRecord, StorageError>;

    async fn find_record(&self, record_id: &str)
    -> Result<Option<ProvisioningRecord>, StorageError>;

    async fn find_record_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProvisioningRecord>, StorageError>;

    /// 按创建时间升序列出。
    async fn list_records(&self) -> Result<Vec<ProvisioningRecord>, StorageError>;

    /// 以新配置重置记录：编译状态回到 pending，烧录状态回到 idle。
    async fn reset_config(
        &self,
        record_id: &str,
        reset: ConfigReset,
    ) -> Result<Option<ProvisioningRecord>, StorageError>;

    async fn update_compile(
        &self,
        record_id: &str,
        update: CompileUpdate,
    ) -> Result<Option<ProvisioningRecord>, StorageError>;

    async fn update_upload(
        &self,
        record_id: &str,
        update: UploadUpdate,
    ) -> Result<Option<ProvisioningRecord>, StorageError>;

    async fn set_ip_address(
        &self,
        record_id: &str,
        ip_address: &str,
        updated_at_ms: i64,
    ) -> Result<Option<ProvisioningRecord>, StorageError>;
}

/// 设备存储接口。
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError>;

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError>;

    async fn find_device_by_name(&self, name: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// 按显示名精确匹配，未命中时再按 slug 精确匹配。
    async fn find_device_by_key(&self, key: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// 创建设备；显示名已存在时返回错误。
    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError>;

    /// 更新在线状态与最后活跃时间。
    async fn set_status(
        &self,
        device_id: &str,
        status: &str,
        last_seen_at_ms: i64,
    ) -> Result<bool, StorageError>;
}

/// 实体存储接口。
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list_entities(&self, device_id: &str) -> Result<Vec<EntityRecord>, StorageError>;

    async fn find_entity(
        &self,
        device_id: &str,
        name: &str,
    ) -> Result<Option<EntityRecord>, StorageError>;

    async fn create_entity(&self, record: EntityRecord) -> Result<EntityRecord, StorageError>;

    async fn update_value(
        &self,
        entity_id: &str,
        value: &str,
        updated_at_ms: i64,
    ) -> Result<bool, StorageError>;
}

/// 历史记录存储接口（只追加）。
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append_history(&self, record: HistoryRecord) -> Result<(), StorageError>;

    /// 按时间升序列出。
    async fn list_history(&self, entity_id: &str) -> Result<Vec<HistoryRecord>, StorageError>;
}
