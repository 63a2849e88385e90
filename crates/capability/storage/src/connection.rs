//! Postgres 连接池

use crate::error::StorageError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// 连接池上限；后台编译任务与 HTTP 请求共用。
const MAX_CONNECTIONS: u32 = 8;

/// 建立连接池，启动时若数据库不可达则直接失败。
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
        .map_err(StorageError::from)
}
