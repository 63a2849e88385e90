//! Postgres 历史记录存储实现

use crate::error::StorageError;
use crate::models::HistoryRecord;
use crate::traits::HistoryStore;
use sqlx::{PgPool, Row};

pub struct PgHistoryStore {
    pub pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append_history(&self, record: HistoryRecord) -> Result<(), StorageError> {
        sqlx::query(
            "insert into entity_history (history_id, entity_id, old_value, new_value, ts) \
             values ($1, $2, $3, $4, to_timestamp($5 / 1000.0))",
        )
        .bind(&record.history_id)
        .bind(&record.entity_id)
        .bind(&record.old_value)
        .bind(&record.new_value)
        .bind(record.ts_ms as f64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_history(&self, entity_id: &str) -> Result<Vec<HistoryRecord>, StorageError> {
        let rows = sqlx::query(
            "select history_id, entity_id, old_value, new_value, \
             (extract(epoch from ts) * 1000)::bigint as ts_ms \
             from entity_history where entity_id = $1 order by ts asc",
        )
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(HistoryRecord {
                history_id: row.try_get("history_id")?,
                entity_id: row.try_get("entity_id")?,
                old_value: row.try_get("old_value")?,
                new_value: row.try_get("new_value")?,
                ts_ms: row.try_get("ts_ms")?,
            });
        }
        Ok(items)
    }
}
