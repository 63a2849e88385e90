//! 实时遥测接入。
//!
//! MQTT 事件循环只负责解析与转发：消息经有界通道交给独立的 worker，
//! worker 通过 [`TelemetryHandler`] 更新设备在线状态、实体当前值与变更历史。
//! 单条消息的失败只记录日志，订阅者不会因坏消息退出。

mod handler;
mod mqtt;
mod topic;

pub use handler::{IngestOutcome, StoreTelemetryHandler, TelemetryHandler, TelemetryMessage};
pub use mqtt::{Backoff, MqttSource, MqttSourceConfig};
pub use topic::{TelemetryTopic, parse_topic, subscriptions};

/// 接入错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("malformed telemetry topic: {0}")]
    MalformedTopic(String),
    #[error("no device matches {0}")]
    DeviceNotFound(String),
    #[error("device {device} has no entity {sensor}")]
    EntityNotFound { device: String, sensor: String },
    #[error("storage error: {0}")]
    Storage(String),
}

impl IngestError {
    /// 查找未命中（设备或实体不存在）。
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            IngestError::DeviceNotFound(_) | IngestError::EntityNotFound { .. }
        )
    }
}
