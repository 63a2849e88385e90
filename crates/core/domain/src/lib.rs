pub mod config_tree;
pub mod data;
pub mod slug;
pub mod status;
pub mod template;

pub use config_tree::{ConfigMap, ConfigValue, placeholder_name};
pub use data::{DiscoveredHost, GeneratedConfig, ProvisioningRequest, UNKNOWN_VALUE};
pub use slug::slugify;
pub use status::{BuildFailure, BuildResult, ProvisioningStatus, UploadStatus};
pub use template::{DeclaredEntity, DeviceTemplate, PinKind, PinSpec};

/// 当前 Unix 时间戳（毫秒）。
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
