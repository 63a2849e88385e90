//! Postgres 设备存储实现

use crate::error::StorageError;
use crate::models::DeviceRecord;
use crate::traits::DeviceStore;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const DEVICE_COLUMNS: &str = "device_id, name, slug, device_type, site_location_id, ip_address, status, \
     (extract(epoch from last_seen_at) * 1000)::bigint as last_seen_at_ms, \
     (extract(epoch from created_at) * 1000)::bigint as created_at_ms";

pub struct PgDeviceStore {
    pub pool: PgPool,
}

impl PgDeviceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn device_from_row(row: &PgRow) -> Result<DeviceRecord, StorageError> {
    Ok(DeviceRecord {
        device_id: row.try_get("device_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        device_type: row.try_get("device_type")?,
        site_location_id: row.try_get("site_location_id")?,
        ip_address: row.try_get("ip_address")?,
        status: row.try_get("status")?,
        last_seen_at_ms: row.try_get("last_seen_at_ms")?,
        created_at_ms: row.try_get("created_at_ms")?,
    })
}

#[async_trait::async_trait]
impl DeviceStore for PgDeviceStore {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let sql = format!("select {DEVICE_COLUMNS} from devices order by name asc");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut devices = Vec::with_capacity(rows.len());
        for row in rows {
            devices.push(device_from_row(&row)?);
        }
        Ok(devices)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!("select {DEVICE_COLUMNS} from devices where device_id = $1");
        let row = sqlx::query(&sql)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn find_device_by_name(&self, name: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let sql = format!("select {DEVICE_COLUMNS} from devices where name = $1");
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn find_device_by_key(&self, key: &str) -> Result<Option<DeviceRecord>, StorageError> {
        // 名称精确匹配优先于 slug
        let sql = format!(
            "select {DEVICE_COLUMNS} from devices where name = $1 or slug = $1 \
             order by (name = $1) desc limit 1"
        );
        let row = sqlx::query(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(device_from_row).transpose()
    }

    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        sqlx::query(
            "insert into devices \
             (device_id, name, slug, device_type, site_location_id, ip_address, status, \
             last_seen_at, created_at) \
             values ($1, $2, $3, $4, $5, $6, $7, \
             case when $8::float8 is null then null else to_timestamp($8 / 1000.0) end, \
             to_timestamp($9 / 1000.0))",
        )
        .bind(&record.device_id)
        .bind(&record.name)
        .bind(&record.slug)
        .bind(&record.device_type)
        .bind(record.site_location_id)
        .bind(&record.ip_address)
        .bind(&record.status)
        .bind(record.last_seen_at_ms.map(|ts| ts as f64))
        .bind(record.created_at_ms as f64)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn set_status(
        &self,
        device_id: &str,
        status: &str,
        last_seen_at_ms: i64,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "update devices set status = $1, last_seen_at = to_timestamp($2 / 1000.0) \
             where device_id = $3",
        )
        .bind(status)
        .bind(last_seen_at_ms as f64)
        .bind(device_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
