//! # Sites Storage 模块
//!
//! 烧录记录与设备/实体/历史记录的存储抽象层。
//!
//! ## 模块说明
//!
//! - [`models`]：存储记录与更新结构
//! - [`traits`]：存储接口（`ProvisioningStore`、`DeviceStore`、`EntityStore`、`HistoryStore`）
//! - [`error`]：存储错误类型
//! - [`connection`]：PostgreSQL 连接池管理
//!
//! ## 存储实现
//!
//! - [`in_memory`]：`RwLock<HashMap>` 内存实现，未配置数据库时使用，也是测试替身
//! - [`postgres`]：sqlx 参数化查询实现，表结构见仓库根目录 `migrations/`
//!
//! ## 设计约束
//!
//! - Handler 层不直接写 SQL，统一通过 storage 层
//! - 设备显示名唯一；重复创建返回错误而不是覆盖
//! - 历史记录只追加，不更新

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;

pub use in_memory::{
    InMemoryDeviceStore, InMemoryEntityStore, InMemoryHistoryStore, InMemoryProvisioningStore,
};

pub use postgres::{PgDeviceStore, PgEntityStore, PgHistoryStore, PgProvisioningStore};
