//! 烧录入口：生成配置并启动首次编译。

use crate::orchestrator::BuildOrchestrator;
use crate::ProvisioningError;
use domain::{DeviceTemplate, ProvisioningRequest, ProvisioningStatus, UploadStatus, now_epoch_ms};
use sites_generator::{ConfigFileStore, ConfigGenerator, render_yaml};
use sites_secrets::SecretRefs;
use sites_storage::{ConfigReset, ProvisioningRecord, ProvisioningStore};
use sites_telemetry::record_provision_request;
use sites_templates::TemplateRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// `provision` 的结果。
#[derive(Debug)]
pub struct ProvisionOutcome {
    pub record: ProvisioningRecord,
    pub config_yaml: String,
    pub config_file: PathBuf,
    pub compile_task: JoinHandle<()>,
}

/// 烧录服务。
#[derive(Clone)]
pub struct ProvisioningService {
    registry: Arc<TemplateRegistry>,
    generator: ConfigGenerator,
    refs: SecretRefs,
    files: ConfigFileStore,
    records: Arc<dyn ProvisioningStore>,
    orchestrator: BuildOrchestrator,
}

impl ProvisioningService {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        generator: ConfigGenerator,
        refs: SecretRefs,
        files: ConfigFileStore,
        records: Arc<dyn ProvisioningStore>,
        orchestrator: BuildOrchestrator,
    ) -> Self {
        Self {
            registry,
            generator,
            refs,
            files,
            records,
            orchestrator,
        }
    }

    pub fn templates(&self) -> &[DeviceTemplate] {
        self.registry.list()
    }

    pub fn template(&self, template_id: &str) -> Option<&DeviceTemplate> {
        self.registry.get(template_id).ok()
    }

    pub fn orchestrator(&self) -> &BuildOrchestrator {
        &self.orchestrator
    }

    /// 生成 → 渲染 → 落盘 → 建记录（pending）→ 启动编译。
    ///
    /// 同一 slug 已有记录时以新配置重置该记录，而不是再建一条。
    /// 该 slug 正在构建时拒绝（配置文件正被工具链使用）。
    pub async fn provision(
        &self,
        request: ProvisioningRequest,
    ) -> Result<ProvisionOutcome, ProvisioningError> {
        record_provision_request();
        let generated = self
            .generator
            .generate_from_registry(&self.registry, &request, &self.refs)?;
        let config_yaml = render_yaml(&generated.document)?;
        let slug = generated.slug;

        let lease = self
            .orchestrator
            .leases()
            .try_acquire(&slug)
            .ok_or_else(|| ProvisioningError::Busy(slug.clone()))?;
        let config_file = self.files.save(&slug, &config_yaml)?;

        let now = now_epoch_ms();
        let existing = self
            .records
            .find_record_by_slug(&slug)
            .await
            .map_err(|err| ProvisioningError::Storage(err.to_string()))?;
        let record = match existing {
            Some(existing) => {
                let reset = ConfigReset {
                    name: request.name.clone(),
                    template_id: request.template_id.clone(),
                    site_location_id: request.site_location_id,
                    config_yaml: config_yaml.clone(),
                    updated_at_ms: now,
                };
                self.records
                    .reset_config(&existing.record_id, reset)
                    .await
                    .map_err(|err| ProvisioningError::Storage(err.to_string()))?
                    .ok_or_else(|| ProvisioningError::NotFound(existing.record_id.clone()))?
            }
            None => {
                let record = ProvisioningRecord {
                    record_id: uuid::Uuid::new_v4().to_string(),
                    name: request.name.clone(),
                    slug: slug.clone(),
                    template_id: request.template_id.clone(),
                    site_location_id: request.site_location_id,
                    ip_address: None,
                    config_yaml: config_yaml.clone(),
                    compile_status: ProvisioningStatus::Pending,
                    upload_status: UploadStatus::Idle,
                    firmware_version: None,
                    last_build: None,
                    created_at_ms: now,
                    updated_at_ms: now,
                };
                self.records
                    .create_record(record)
                    .await
                    .map_err(|err| ProvisioningError::Storage(err.to_string()))?
            }
        };
        info!(
            target: "sites.build",
            record_id = %record.record_id,
            slug = %record.slug,
            template = %record.template_id,
            "device_provisioned"
        );

        let compile_task = self.orchestrator.spawn_compile(record.clone(), lease);
        Ok(ProvisionOutcome {
            record,
            config_yaml,
            config_file,
            compile_task,
        })
    }

    pub async fn list_records(&self) -> Result<Vec<ProvisioningRecord>, ProvisioningError> {
        self.records
            .list_records()
            .await
            .map_err(|err| ProvisioningError::Storage(err.to_string()))
    }

    pub async fn find_record(
        &self,
        record_id: &str,
    ) -> Result<ProvisioningRecord, ProvisioningError> {
        self.records
            .find_record(record_id)
            .await
            .map_err(|err| ProvisioningError::Storage(err.to_string()))?
            .ok_or_else(|| ProvisioningError::NotFound(record_id.to_string()))
    }

    pub async fn start_compile(
        &self,
        record_id: &str,
    ) -> Result<JoinHandle<()>, ProvisioningError> {
        self.orchestrator.start_compile(record_id).await
    }

    pub async fn start_upload(
        &self,
        record_id: &str,
        address: Option<String>,
    ) -> Result<JoinHandle<()>, ProvisioningError> {
        self.orchestrator.start_upload(record_id, address).await
    }
}
