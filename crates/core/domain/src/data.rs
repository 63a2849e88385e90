use crate::config_tree::{ConfigMap, ConfigValue};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// 实体初始值（尚未收到任何上报）。
pub const UNKNOWN_VALUE: &str = "unknown";

/// 设备烧录请求（仅在一次生成调用内存在）。
#[derive(Debug, Clone)]
pub struct ProvisioningRequest {
    pub name: String,
    pub template_id: String,
    /// 引脚角色 → 引脚绑定（如 `motion_pin` → `GPIO2`）。
    pub pins: BTreeMap<String, String>,
    pub site_location_id: Option<i64>,
}

/// 生成后的完整配置。
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedConfig {
    pub slug: String,
    pub document: ConfigMap,
}

impl GeneratedConfig {
    /// 文档中残留的占位符名。
    pub fn unresolved_placeholders(&self) -> Vec<String> {
        self.document
            .values()
            .flat_map(ConfigValue::placeholders)
            .collect()
    }
}

/// 发现扫描命中的主机。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredHost {
    pub ip: Ipv4Addr,
    pub hostname: Option<String>,
    /// 探测证据（设备信息文本，取不到时为 `Unknown`）。
    pub evidence: String,
}
