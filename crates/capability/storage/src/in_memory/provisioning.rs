//! 烧录记录内存存储实现

use crate::error::StorageError;
use crate::models::{CompileUpdate, ConfigReset, ProvisioningRecord, UploadUpdate};
use crate::traits::ProvisioningStore;
use domain::{ProvisioningStatus, UploadStatus};
use std::collections::HashMap;
use std::sync::RwLock;

/// 烧录记录内存存储（按 record_id 索引）。
pub struct InMemoryProvisioningStore {
    records: RwLock<HashMap<String, ProvisioningRecord>>,
}

impl InMemoryProvisioningStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    fn modify<F>(&self, record_id: &str, apply: F) -> Result<Option<ProvisioningRecord>, StorageError>
    where
        F: FnOnce(&mut ProvisioningRecord),
    {
        let mut map = self
            .records
            .write()
            .map_err(|_| StorageError::Lock)?;
        let Some(record) = map.get_mut(record_id) else {
            return Ok(None);
        };
        apply(record);
        Ok(Some(record.clone()))
    }
}

impl Default for InMemoryProvisioningStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProvisioningStore for InMemoryProvisioningStore {
    async fn create_record(
        &self,
        record: ProvisioningRecord,
    ) -> Result<ProvisioningRecord, StorageError> {
        let mut map = self
            .records
            .write()
            .map_err(|_| StorageError::Lock)?;
        if map.contains_key(&record.record_id) {
            return Err(StorageError::Conflict("record"));
        }
        if map.values().any(|item| item.slug == record.slug) {
            return Err(StorageError::Conflict("slug"));
        }
        map.insert(record.record_id.clone(), record.clone());
        Ok(record)
    }

    async fn find_record(
        &self,
        record_id: &str,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let item = self
            .records
            .read()
            .ok()
            .and_then(|map| map.get(record_id).cloned());
        Ok(item)
    }

    async fn find_record_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let item = self
            .records
            .read()
            .ok()
            .and_then(|map| map.values().find(|item| item.slug == slug).cloned());
        Ok(item)
    }

    async fn list_records(&self) -> Result<Vec<ProvisioningRecord>, StorageError> {
        let mut items: Vec<ProvisioningRecord> = self
            .records
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        items.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(items)
    }

    async fn reset_config(
        &self,
        record_id: &str,
        reset: ConfigReset,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        self.modify(record_id, |record| {
            record.name = reset.name;
            record.template_id = reset.template_id;
            record.site_location_id = reset.site_location_id;
            record.config_yaml = reset.config_yaml;
            record.compile_status = ProvisioningStatus::Pending;
            record.upload_status = UploadStatus::Idle;
            record.firmware_version = None;
            record.last_build = None;
            record.updated_at_ms = reset.updated_at_ms;
        })
    }

    async fn update_compile(
        &self,
        record_id: &str,
        update: CompileUpdate,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        self.modify(record_id, |record| {
            record.compile_status = update.status;
            if update.firmware_version.is_some() {
                record.firmware_version = update.firmware_version;
            }
            if update.last_build.is_some() {
                record.last_build = update.last_build;
            }
            record.updated_at_ms = update.updated_at_ms;
        })
    }

    async fn update_upload(
        &self,
        record_id: &str,
        update: UploadUpdate,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        self.modify(record_id, |record| {
            record.upload_status = update.status;
            if update.last_build.is_some() {
                record.last_build = update.last_build;
            }
            record.updated_at_ms = update.updated_at_ms;
        })
    }

    async fn set_ip_address(
        &self,
        record_id: &str,
        ip_address: &str,
        updated_at_ms: i64,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        self.modify(record_id, |record| {
            record.ip_address = Some(ip_address.to_string());
            record.updated_at_ms = updated_at_ms;
        })
    }
}
