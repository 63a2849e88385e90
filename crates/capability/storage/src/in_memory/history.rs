//! 历史记录内存存储实现

use crate::error::StorageError;
use crate::models::HistoryRecord;
use crate::traits::HistoryStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// 按 entity_id 分组的追加列表。
pub struct InMemoryHistoryStore {
    history: RwLock<HashMap<String, Vec<HistoryRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            history: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append_history(&self, record: HistoryRecord) -> Result<(), StorageError> {
        let mut map = self
            .history
            .write()
            .map_err(|_| StorageError::Lock)?;
        map.entry(record.entity_id.clone()).or_default().push(record);
        Ok(())
    }

    async fn list_history(&self, entity_id: &str) -> Result<Vec<HistoryRecord>, StorageError> {
        let mut items = self
            .history
            .read()
            .ok()
            .and_then(|map| map.get(entity_id).cloned())
            .unwrap_or_default();
        items.sort_by_key(|item| item.ts_ms);
        Ok(items)
    }
}
