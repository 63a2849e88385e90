//! # PostgreSQL 存储实现模块
//!
//! - **ProvisioningStore** (`provisioning.rs`)：`provisioning_records` 表
//! - **DeviceStore** (`device.rs`)：`devices` 表（`name` 唯一）
//! - **EntityStore** (`entity.rs`)：`entities` 表（`(device_id, name)` 唯一）
//! - **HistoryStore** (`history.rs`)：`entity_history` 表
//!
//! 时间戳列为 `timestamptz`，写入用 `to_timestamp($n / 1000.0)`，
//! 读取用 `(extract(epoch from col) * 1000)::bigint` 还原为毫秒。
//! 所有 SQL 使用参数绑定。

pub mod device;
pub mod entity;
pub mod history;
pub mod provisioning;

pub use device::*;
pub use entity::*;
pub use history::*;
pub use provisioning::*;
