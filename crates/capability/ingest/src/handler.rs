use crate::IngestError;
use crate::topic::{TelemetryTopic, parse_topic};
use async_trait::async_trait;
use domain::{now_epoch_ms, slugify};
use sites_storage::{
    DEVICE_OFFLINE, DEVICE_ONLINE, DeviceRecord, DeviceStore, EntityRecord, EntityStore,
    HistoryRecord, HistoryStore,
};
use sites_telemetry::record_telemetry_history_appended;
use std::sync::Arc;

/// 一条总线消息。
#[derive(Debug, Clone)]
pub struct TelemetryMessage {
    pub topic: String,
    pub payload: String,
    pub received_at_ms: i64,
}

impl TelemetryMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            received_at_ms: now_epoch_ms(),
        }
    }
}

/// 单条消息的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 值变化：已更新并追加历史。
    Updated {
        entity_id: String,
        old_value: String,
        new_value: String,
    },
    /// 值未变化：不写历史。
    Unchanged { entity_id: String },
    Availability { device_id: String, status: String },
}

/// 遥测消息处理器。
#[async_trait]
pub trait TelemetryHandler: Send + Sync {
    async fn handle(&self, message: TelemetryMessage) -> Result<IngestOutcome, IngestError>;
}

/// 基于存储层的处理器：维护设备在线状态、实体当前值与变更历史。
#[derive(Clone)]
pub struct StoreTelemetryHandler {
    namespace: String,
    devices: Arc<dyn DeviceStore>,
    entities: Arc<dyn EntityStore>,
    history: Arc<dyn HistoryStore>,
}

impl StoreTelemetryHandler {
    pub fn new(
        namespace: impl Into<String>,
        devices: Arc<dyn DeviceStore>,
        entities: Arc<dyn EntityStore>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            devices,
            entities,
            history,
        }
    }

    async fn device(&self, key: &str) -> Result<DeviceRecord, IngestError> {
        self.devices
            .find_device_by_key(key)
            .await
            .map_err(|err| IngestError::Storage(err.to_string()))?
            .ok_or_else(|| IngestError::DeviceNotFound(key.to_string()))
    }

    async fn entity(&self, device: &DeviceRecord, sensor: &str) -> Result<EntityRecord, IngestError> {
        let found = self
            .entities
            .find_entity(&device.device_id, sensor)
            .await
            .map_err(|err| IngestError::Storage(err.to_string()))?;
        let found = match found {
            Some(entity) => Some(entity),
            None => {
                let slug = slugify(sensor);
                if slug == sensor {
                    None
                } else {
                    self.entities
                        .find_entity(&device.device_id, &slug)
                        .await
                        .map_err(|err| IngestError::Storage(err.to_string()))?
                }
            }
        };
        found.ok_or_else(|| IngestError::EntityNotFound {
            device: device.name.clone(),
            sensor: sensor.to_string(),
        })
    }

    async fn mark_status(&self, device_id: &str, status: &str, ts_ms: i64) -> Result<(), IngestError> {
        self.devices
            .set_status(device_id, status, ts_ms)
            .await
            .map_err(|err| IngestError::Storage(err.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl TelemetryHandler for StoreTelemetryHandler {
    async fn handle(&self, message: TelemetryMessage) -> Result<IngestOutcome, IngestError> {
        let topic = parse_topic(&self.namespace, &message.topic)
            .ok_or_else(|| IngestError::MalformedTopic(message.topic.clone()))?;
        let value = message.payload.trim().to_string();
        let device = self.device(topic.device()).await?;
        let ts_ms = message.received_at_ms;

        match topic {
            TelemetryTopic::Availability { .. } => {
                let status = if value.eq_ignore_ascii_case(DEVICE_OFFLINE) {
                    DEVICE_OFFLINE
                } else {
                    DEVICE_ONLINE
                };
                self.mark_status(&device.device_id, status, ts_ms).await?;
                Ok(IngestOutcome::Availability {
                    device_id: device.device_id,
                    status: status.to_string(),
                })
            }
            TelemetryTopic::State { sensor, .. } => {
                self.mark_status(&device.device_id, DEVICE_ONLINE, ts_ms).await?;
                let entity = self.entity(&device, &sensor).await?;
                if entity.current_value == value {
                    return Ok(IngestOutcome::Unchanged {
                        entity_id: entity.entity_id,
                    });
                }
                self.entities
                    .update_value(&entity.entity_id, &value, ts_ms)
                    .await
                    .map_err(|err| IngestError::Storage(err.to_string()))?;
                self.history
                    .append_history(HistoryRecord {
                        history_id: uuid::Uuid::new_v4().to_string(),
                        entity_id: entity.entity_id.clone(),
                        old_value: entity.current_value.clone(),
                        new_value: value.clone(),
                        ts_ms,
                    })
                    .await
                    .map_err(|err| IngestError::Storage(err.to_string()))?;
                record_telemetry_history_appended();
                Ok(IngestOutcome::Updated {
                    entity_id: entity.entity_id,
                    old_value: entity.current_value,
                    new_value: value,
                })
            }
        }
    }
}
