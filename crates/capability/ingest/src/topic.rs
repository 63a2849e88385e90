//! 遥测 topic 解析。
//!
//! 支持三种布局（`<ns>` 为命名空间，可含多级）：
//!
//! - `<ns>/<device>/<family>/<sensor>/state`：ESPHome 实体状态
//! - `<ns>/<device>/status`：设备可用性（online/offline）
//! - `<ns>/<device>/<sensor>`：紧凑布局的实体状态

/// 解析后的 topic。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryTopic {
    State { device: String, sensor: String },
    Availability { device: String },
}

impl TelemetryTopic {
    pub fn device(&self) -> &str {
        match self {
            TelemetryTopic::State { device, .. } => device,
            TelemetryTopic::Availability { device } => device,
        }
    }
}

/// 订阅的两个 topic 过滤器。
pub fn subscriptions(namespace: &str) -> [String; 2] {
    let ns = namespace.trim_matches('/');
    [format!("{ns}/+/+/+/state"), format!("{ns}/+/+")]
}

pub fn parse_topic(namespace: &str, topic: &str) -> Option<TelemetryTopic> {
    let ns = namespace.trim_matches('/');
    let rest = topic.strip_prefix(ns)?.strip_prefix('/')?;
    let parts: Vec<&str> = rest.split('/').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return None;
    }
    match parts.as_slice() {
        [device, "status"] => Some(TelemetryTopic::Availability {
            device: device.to_string(),
        }),
        [device, sensor] => Some(TelemetryTopic::State {
            device: device.to_string(),
            sensor: sensor.to_string(),
        }),
        [device, _family, sensor, "state"] => Some(TelemetryTopic::State {
            device: device.to_string(),
            sensor: sensor.to_string(),
        }),
        _ => None,
    }
}
