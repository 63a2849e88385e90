//! 设备内存存储实现

use crate::error::StorageError;
use crate::models::DeviceRecord;
use crate::traits::DeviceStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// 设备内存存储
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储。
pub struct InMemoryDeviceStore {
    devices: RwLock<HashMap<String, DeviceRecord>>,
}

impl InMemoryDeviceStore {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryDeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeviceStore for InMemoryDeviceStore {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let mut items: Vec<DeviceRecord> = self
            .devices
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let item = self
            .devices
            .read()
            .ok()
            .and_then(|map| map.get(device_id).cloned());
        Ok(item)
    }

    async fn find_device_by_name(&self, name: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let item = self
            .devices
            .read()
            .ok()
            .and_then(|map| map.values().find(|item| item.name == name).cloned());
        Ok(item)
    }

    async fn find_device_by_key(&self, key: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let map = self
            .devices
            .read()
            .map_err(|_| StorageError::Lock)?;
        let item = map
            .values()
            .find(|item| item.name == key)
            .or_else(|| map.values().find(|item| item.slug == key))
            .cloned();
        Ok(item)
    }

    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::Lock)?;
        if map.contains_key(&record.device_id) || map.values().any(|item| item.name == record.name)
        {
            return Err(StorageError::Conflict("device"));
        }
        map.insert(record.device_id.clone(), record.clone());
        Ok(record)
    }

    async fn set_status(
        &self,
        device_id: &str,
        status: &str,
        last_seen_at_ms: i64,
    ) -> Result<bool, StorageError> {
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::Lock)?;
        let Some(device) = map.get_mut(device_id) else {
            return Ok(false);
        };
        device.status = status.to_string();
        device.last_seen_at_ms = Some(last_seen_at_ms);
        Ok(true)
    }
}
