//! Postgres 烧录记录存储实现

use crate::error::StorageError;
use crate::models::{CompileUpdate, ConfigReset, ProvisioningRecord, UploadUpdate};
use crate::traits::ProvisioningStore;
use domain::{BuildResult, ProvisioningStatus, UploadStatus};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const RECORD_COLUMNS: &str = "record_id, name, slug, template_id, site_location_id, ip_address, \
     config_yaml, compile_status, upload_status, firmware_version, \
     last_build_success, last_build_stdout, last_build_stderr, last_build_exit_code, \
     last_build_timed_out, \
     (extract(epoch from created_at) * 1000)::bigint as created_at_ms, \
     (extract(epoch from updated_at) * 1000)::bigint as updated_at_ms";

pub struct PgProvisioningStore {
    pub pool: PgPool,
}

impl PgProvisioningStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

fn record_from_row(row: &PgRow) -> Result<ProvisioningRecord, StorageError> {
    let compile_status: String = row.try_get("compile_status")?;
    let upload_status: String = row.try_get("upload_status")?;
    let last_build_success: Option<bool> = row.try_get("last_build_success")?;
    let last_build = match last_build_success {
        Some(success) => Some(BuildResult {
            success,
            stdout: row
                .try_get::<Option<String>, _>("last_build_stdout")?
                .unwrap_or_default(),
            stderr: row
                .try_get::<Option<String>, _>("last_build_stderr")?
                .unwrap_or_default(),
            exit_code: row.try_get("last_build_exit_code")?,
            timed_out: row
                .try_get::<Option<bool>, _>("last_build_timed_out")?
                .unwrap_or(false),
        }),
        None => None,
    };
    Ok(ProvisioningRecord {
        record_id: row.try_get("record_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        template_id: row.try_get("template_id")?,
        site_location_id: row.try_get("site_location_id")?,
        ip_address: row.try_get("ip_address")?,
        config_yaml: row.try_get("config_yaml")?,
        compile_status: ProvisioningStatus::parse(&compile_status)
            .ok_or_else(|| StorageError::Corrupt(format!("invalid compile status: {compile_status}")))?,
        upload_status: UploadStatus::parse(&upload_status)
            .ok_or_else(|| StorageError::Corrupt(format!("invalid upload status: {upload_status}")))?,
        firmware_version: row.try_get("firmware_version")?,
        last_build,
        created_at_ms: row.try_get("created_at_ms")?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

fn optional_record(row: Option<PgRow>) -> Result<Option<ProvisioningRecord>, StorageError> {
    match row {
        Some(row) => record_from_row(&row).map(Some),
        None => Ok(None),
    }
}

#[async_trait::async_trait]
impl ProvisioningStore for PgProvisioningStore {
    async fn create_record(
        &self,
        record: ProvisioningRecord,
    ) -> Result<ProvisioningRecord, StorageError> {
        sqlx::query(
            "insert into provisioning_records \
             (record_id, name, slug, template_id, site_location_id, ip_address, config_yaml, \
             compile_status, upload_status, firmware_version, created_at, updated_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, \
             to_timestamp($11 / 1000.0), to_timestamp($12 / 1000.0))",
        )
        .bind(&record.record_id)
        .bind(&record.name)
        .bind(&record.slug)
        .bind(&record.template_id)
        .bind(record.site_location_id)
        .bind(&record.ip_address)
        .bind(&record.config_yaml)
        .bind(record.compile_status.as_str())
        .bind(record.upload_status.as_str())
        .bind(&record.firmware_version)
        .bind(record.created_at_ms as f64)
        .bind(record.updated_at_ms as f64)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_record(
        &self,
        record_id: &str,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let sql = format!("select {RECORD_COLUMNS} from provisioning_records where record_id = $1");
        let row = sqlx::query(&sql)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }

    async fn find_record_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let sql = format!("select {RECORD_COLUMNS} from provisioning_records where slug = $1");
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }

    async fn list_records(&self) -> Result<Vec<ProvisioningRecord>, StorageError> {
        let sql = format!(
            "select {RECORD_COLUMNS} from provisioning_records order by created_at asc, slug asc"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(record_from_row(&row)?);
        }
        Ok(records)
    }

    async fn reset_config(
        &self,
        record_id: &str,
        reset: ConfigReset,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let sql = format!(
            "update provisioning_records set \
             name = $1, template_id = $2, site_location_id = $3, config_yaml = $4, \
             compile_status = $5, upload_status = $6, firmware_version = null, \
             last_build_success = null, last_build_stdout = null, last_build_stderr = null, \
             last_build_exit_code = null, last_build_timed_out = null, \
             updated_at = to_timestamp($7 / 1000.0) \
             where record_id = $8 returning {RECORD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&reset.name)
            .bind(&reset.template_id)
            .bind(reset.site_location_id)
            .bind(&reset.config_yaml)
            .bind(ProvisioningStatus::Pending.as_str())
            .bind(UploadStatus::Idle.as_str())
            .bind(reset.updated_at_ms as f64)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }

    async fn update_compile(
        &self,
        record_id: &str,
        update: CompileUpdate,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let build = update.last_build.as_ref();
        let sql = format!(
            "update provisioning_records set \
             compile_status = $1, \
             firmware_version = coalesce($2, firmware_version), \
             last_build_success = coalesce($3, last_build_success), \
             last_build_stdout = case when $3 is null then last_build_stdout else $4 end, \
             last_build_stderr = case when $3 is null then last_build_stderr else $5 end, \
             last_build_exit_code = case when $3 is null then last_build_exit_code else $6 end, \
             last_build_timed_out = case when $3 is null then last_build_timed_out else $7 end, \
             updated_at = to_timestamp($8 / 1000.0) \
             where record_id = $9 returning {RECORD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(update.status.as_str())
            .bind(&update.firmware_version)
            .bind(build.map(|b| b.success))
            .bind(build.map(|b| b.stdout.clone()))
            .bind(build.map(|b| b.stderr.clone()))
            .bind(build.and_then(|b| b.exit_code))
            .bind(build.map(|b| b.timed_out))
            .bind(update.updated_at_ms as f64)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }

    async fn update_upload(
        &self,
        record_id: &str,
        update: UploadUpdate,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let build = update.last_build.as_ref();
        let sql = format!(
            "update provisioning_records set \
             upload_status = $1, \
             last_build_success = coalesce($2, last_build_success), \
             last_build_stdout = case when $2 is null then last_build_stdout else $3 end, \
             last_build_stderr = case when $2 is null then last_build_stderr else $4 end, \
             last_build_exit_code = case when $2 is null then last_build_exit_code else $5 end, \
             last_build_timed_out = case when $2 is null then last_build_timed_out else $6 end, \
             updated_at = to_timestamp($7 / 1000.0) \
             where record_id = $8 returning {RECORD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(update.status.as_str())
            .bind(build.map(|b| b.success))
            .bind(build.map(|b| b.stdout.clone()))
            .bind(build.map(|b| b.stderr.clone()))
            .bind(build.and_then(|b| b.exit_code))
            .bind(build.map(|b| b.timed_out))
            .bind(update.updated_at_ms as f64)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }

    async fn set_ip_address(
        &self,
        record_id: &str,
        ip_address: &str,
        updated_at_ms: i64,
    ) -> Result<Option<ProvisioningRecord>, StorageError> {
        let sql = format!(
            "update provisioning_records set ip_address = $1, updated_at = to_timestamp($2 / 1000.0) \
             where record_id = $3 returning {RECORD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(ip_address)
            .bind(updated_at_ms as f64)
            .bind(record_id)
            .fetch_optional(&self.pool)
            .await?;
        optional_record(row)
    }
}
