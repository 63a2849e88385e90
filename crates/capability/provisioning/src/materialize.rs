use crate::ProvisioningError;
use domain::{DeviceTemplate, UNKNOWN_VALUE, now_epoch_ms, slugify};
use sites_storage::{
    DEVICE_OFFLINE, DeviceRecord, DeviceStore, EntityRecord, EntityStore, ProvisioningRecord,
};
use sites_telemetry::record_device_materialized;
use std::sync::Arc;
use tracing::info;

/// 落库结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    Created { device_id: String, entities: usize },
    /// 同名设备已存在，未做任何写入。
    AlreadyExists { device_id: String },
}

/// 烧录成功后创建设备与实体。按显示名幂等。
#[derive(Clone)]
pub struct DeviceMaterializer {
    devices: Arc<dyn DeviceStore>,
    entities: Arc<dyn EntityStore>,
}

impl DeviceMaterializer {
    pub fn new(devices: Arc<dyn DeviceStore>, entities: Arc<dyn EntityStore>) -> Self {
        Self { devices, entities }
    }

    pub async fn materialize(
        &self,
        record: &ProvisioningRecord,
        template: &DeviceTemplate,
    ) -> Result<MaterializeOutcome, ProvisioningError> {
        let existing = self
            .devices
            .find_device_by_name(&record.name)
            .await
            .map_err(|err| ProvisioningError::Storage(err.to_string()))?;
        if let Some(device) = existing {
            return Ok(MaterializeOutcome::AlreadyExists {
                device_id: device.device_id,
            });
        }

        let now = now_epoch_ms();
        let device = DeviceRecord {
            device_id: uuid::Uuid::new_v4().to_string(),
            name: record.name.clone(),
            slug: record.slug.clone(),
            device_type: record.template_id.clone(),
            site_location_id: record.site_location_id,
            ip_address: record.ip_address.clone(),
            status: DEVICE_OFFLINE.to_string(),
            last_seen_at_ms: None,
            created_at_ms: now,
        };
        let device = self
            .devices
            .create_device(device)
            .await
            .map_err(|err| ProvisioningError::Storage(err.to_string()))?;

        let declared = template.declared_entities();
        for entity in &declared {
            let entity = EntityRecord {
                entity_id: uuid::Uuid::new_v4().to_string(),
                device_id: device.device_id.clone(),
                name: slugify(&entity.name),
                entity_type: entity.entity_type.clone(),
                unit: entity.unit.clone(),
                current_value: UNKNOWN_VALUE.to_string(),
                updated_at_ms: now,
            };
            self.entities
                .create_entity(entity)
                .await
                .map_err(|err| ProvisioningError::Storage(err.to_string()))?;
        }
        record_device_materialized();
        info!(
            target: "sites.build",
            device_id = %device.device_id,
            slug = %device.slug,
            entities = declared.len(),
            "device_materialized"
        );
        Ok(MaterializeOutcome::Created {
            device_id: device.device_id,
            entities: declared.len(),
        })
    }
}
