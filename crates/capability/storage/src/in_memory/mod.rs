//! 内存存储实现模块
//!
//! 未配置数据库时使用，也用于测试。
//!
//! - ProvisioningStore: InMemoryProvisioningStore
//! - DeviceStore: InMemoryDeviceStore
//! - EntityStore: InMemoryEntityStore
//! - HistoryStore: InMemoryHistoryStore

pub mod device;
pub mod entity;
pub mod history;
pub mod provisioning;

pub use device::*;
pub use entity::*;
pub use history::*;
pub use provisioning::*;
