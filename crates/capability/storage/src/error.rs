//! 存储层错误类型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// 内存实现的锁已中毒。
    #[error("store lock poisoned")]
    Lock,
    /// 主键或唯一键冲突（如同一 slug 的第二条烧录记录）。
    #[error("{0} already exists")]
    Conflict(&'static str),
    /// 库中的值无法还原为领域类型。
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
