//! 实体内存存储实现

use crate::error::StorageError;
use crate::models::EntityRecord;
use crate::traits::EntityStore;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct InMemoryEntityStore {
    entities: RwLock<HashMap<String, EntityRecord>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn list_entities(&self, device_id: &str) -> Result<Vec<EntityRecord>, StorageError> {
        let mut items: Vec<EntityRecord> = self
            .entities
            .read()
            .map(|map| {
                map.values()
                    .filter(|item| item.device_id == device_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn find_entity(
        &self,
        device_id: &str,
        name: &str,
    ) -> Result<Option<EntityRecord>, StorageError> {
        let item = self.entities.read().ok().and_then(|map| {
            map.values()
                .find(|item| item.device_id == device_id && item.name == name)
                .cloned()
        });
        Ok(item)
    }

    async fn create_entity(&self, record: EntityRecord) -> Result<EntityRecord, StorageError> {
        let mut map = self
            .entities
            .write()
            .map_err(|_| StorageError::Lock)?;
        if map.contains_key(&record.entity_id)
            || map
                .values()
                .any(|item| item.device_id == record.device_id && item.name == record.name)
        {
            return Err(StorageError::Conflict("entity"));
        }
        map.insert(record.entity_id.clone(), record.clone());
        Ok(record)
    }

    async fn update_value(
        &self,
        entity_id: &str,
        value: &str,
        updated_at_ms: i64,
    ) -> Result<bool, StorageError> {
        let mut map = self
            .entities
            .write()
            .map_err(|_| StorageError::Lock)?;
        let Some(entity) = map.get_mut(entity_id) else {
            return Ok(false);
        };
        entity.current_value = value.to_string();
        entity.updated_at_ms = updated_at_ms;
        Ok(true)
    }
}
