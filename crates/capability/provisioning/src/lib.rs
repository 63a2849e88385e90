//! 编译/烧录编排与烧录状态跟踪。
//!
//! - [`BuildLeases`]：按设备 slug 的构建互斥
//! - [`BuildOrchestrator`]：调用工具链，后台任务推进烧录记录状态
//! - [`DeviceMaterializer`]：烧录成功后落库设备与实体
//! - [`ProvisioningService`]：生成 → 渲染 → 落盘 → 建记录 → 启动编译

mod lease;
mod materialize;
mod orchestrator;
mod service;

pub use lease::{BuildLeases, LeaseGuard};
pub use materialize::{DeviceMaterializer, MaterializeOutcome};
pub use orchestrator::{BuildConfig, BuildOrchestrator};
pub use service::{ProvisionOutcome, ProvisioningService};

use sites_generator::GenerateError;

/// 烧录编排错误。
///
/// 工具链失败不在此列：它们作为 `BuildResult` 记录在烧录记录上。
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("provisioning record not found: {0}")]
    NotFound(String),
    #[error("config file not found for device {0}")]
    ConfigNotFound(String),
    #[error("device {0} has a build in progress")]
    Busy(String),
    #[error("device {0} must be compiled successfully first")]
    NotCompiled(String),
    #[error("upload requires a device address")]
    AddressRequired,
    #[error("storage error: {0}")]
    Storage(String),
}
