//! Postgres 实体存储实现

use crate::error::StorageError;
use crate::models::EntityRecord;
use crate::traits::EntityStore;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const ENTITY_COLUMNS: &str = "entity_id, device_id, name, entity_type, unit, current_value, \
     (extract(epoch from updated_at) * 1000)::bigint as updated_at_ms";

pub struct PgEntityStore {
    pub pool: PgPool,
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entity_from_row(row: &PgRow) -> Result<EntityRecord, StorageError> {
    Ok(EntityRecord {
        entity_id: row.try_get("entity_id")?,
        device_id: row.try_get("device_id")?,
        name: row.try_get("name")?,
        entity_type: row.try_get("entity_type")?,
        unit: row.try_get("unit")?,
        current_value: row.try_get("current_value")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

#[async_trait::async_trait]
impl EntityStore for PgEntityStore {
    async fn list_entities(&self, device_id: &str) -> Result<Vec<EntityRecord>, StorageError> {
        let sql = format!(
            "select {ENTITY_COLUMNS} from entities where device_id = $1 order by name asc"
        );
        let rows = sqlx::query(&sql)
            .bind(device_id)
            .fetch_all(&self.pool)
            .await?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            entities.push(entity_from_row(&row)?);
        }
        Ok(entities)
    }

    async fn find_entity(
        &self,
        device_id: &str,
        name: &str,
    ) -> Result<Option<EntityRecord>, StorageError> {
        let sql = format!("select {ENTITY_COLUMNS} from entities where device_id = $1 and name = $2");
        let row = sqlx::query(&sql)
            .bind(device_id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entity_from_row).transpose()
    }

    async fn create_entity(&self, record: EntityRecord) -> Result<EntityRecord, StorageError> {
        sqlx::query(
            "insert into entities \
             (entity_id, device_id, name, entity_type, unit, current_value, updated_at) \
             values ($1, $2, $3, $4, $5, $6, to_timestamp($7 / 1000.0))",
        )
        .bind(&record.entity_id)
        .bind(&record.device_id)
        .bind(&record.name)
        .bind(&record.entity_type)
        .bind(&record.unit)
        .bind(&record.current_value)
        .bind(record.updated_at_ms as f64)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update_value(
        &self,
        entity_id: &str,
        value: &str,
        updated_at_ms: i64,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "update entities set current_value = $1, updated_at = to_timestamp($2 / 1000.0) \
             where entity_id = $3",
        )
        .bind(value)
        .bind(updated_at_ms as f64)
        .bind(entity_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
