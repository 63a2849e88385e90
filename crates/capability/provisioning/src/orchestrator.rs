//! 构建编排。
//!
//! `compile` / `upload` 是同步语义的单次工具链调用；`start_compile` /
//! `start_upload` 校验前置条件、取得设备租约后立即返回任务句柄，
//! 状态推进全部在后台任务里完成，调用方轮询烧录记录观察结果。

use crate::lease::{BuildLeases, LeaseGuard};
use crate::materialize::DeviceMaterializer;
use crate::ProvisioningError;
use domain::{BuildResult, ProvisioningStatus, UploadStatus, now_epoch_ms};
use sites_generator::ConfigFileStore;
use sites_storage::{CompileUpdate, ProvisioningRecord, ProvisioningStore, UploadUpdate};
use sites_telemetry::{
    record_build_duration_ms, record_compile_failure, record_compile_started,
    record_compile_success, record_compile_timeout, record_upload_failure, record_upload_started,
    record_upload_success, record_upload_timeout,
};
use sites_templates::TemplateRegistry;
use sites_toolchain::{Toolchain, ToolchainInvocation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 构建超时与烧录策略。
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub compile_timeout: Duration,
    pub upload_timeout: Duration,
    /// 为 true 时拒绝无地址的烧录（不走串口回退）。
    pub upload_requires_address: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_secs(600),
            upload_timeout: Duration::from_secs(300),
            upload_requires_address: false,
        }
    }
}

/// 构建编排器。
#[derive(Clone)]
pub struct BuildOrchestrator {
    toolchain: Arc<dyn Toolchain>,
    files: ConfigFileStore,
    records: Arc<dyn ProvisioningStore>,
    registry: Arc<TemplateRegistry>,
    materializer: DeviceMaterializer,
    leases: BuildLeases,
    config: BuildConfig,
}

impl BuildOrchestrator {
    pub fn new(
        toolchain: Arc<dyn Toolchain>,
        files: ConfigFileStore,
        records: Arc<dyn ProvisioningStore>,
        registry: Arc<TemplateRegistry>,
        materializer: DeviceMaterializer,
        config: BuildConfig,
    ) -> Self {
        Self {
            toolchain,
            files,
            records,
            registry,
            materializer,
            leases: BuildLeases::new(),
            config,
        }
    }

    pub fn leases(&self) -> &BuildLeases {
        &self.leases
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// 编译 `slug` 的配置文件。配置文件不存在时不启动任何子进程。
    pub async fn compile(&self, slug: &str) -> Result<BuildResult, ProvisioningError> {
        if !self.files.exists(slug) {
            return Err(ProvisioningError::ConfigNotFound(slug.to_string()));
        }
        record_compile_started();
        let invocation =
            ToolchainInvocation::compile(self.files.path_for(slug), self.config.compile_timeout);
        let started_at = Instant::now();
        let result = self.toolchain.run(&invocation).await;
        record_build_duration_ms(elapsed_ms(started_at));
        if result.success {
            record_compile_success();
        } else if result.timed_out {
            record_compile_timeout();
        } else {
            record_compile_failure();
        }
        info!(
            target: "sites.build",
            slug = %slug,
            success = result.success,
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            duration_ms = elapsed_ms(started_at),
            "compile_finished"
        );
        Ok(result)
    }

    /// 烧录 `slug` 的固件；`address` 为空时按策略回退到工具链本地路径。
    pub async fn upload(
        &self,
        slug: &str,
        address: Option<String>,
    ) -> Result<BuildResult, ProvisioningError> {
        if !self.files.exists(slug) {
            return Err(ProvisioningError::ConfigNotFound(slug.to_string()));
        }
        if address.is_none() && self.config.upload_requires_address {
            return Err(ProvisioningError::AddressRequired);
        }
        record_upload_started();
        let invocation = ToolchainInvocation::upload(
            self.files.path_for(slug),
            address.clone(),
            self.config.upload_timeout,
        );
        let started_at = Instant::now();
        let result = self.toolchain.run(&invocation).await;
        record_build_duration_ms(elapsed_ms(started_at));
        if result.success {
            record_upload_success();
        } else if result.timed_out {
            record_upload_timeout();
        } else {
            record_upload_failure();
        }
        info!(
            target: "sites.build",
            slug = %slug,
            address = ?address,
            success = result.success,
            exit_code = ?result.exit_code,
            timed_out = result.timed_out,
            duration_ms = elapsed_ms(started_at),
            "upload_finished"
        );
        Ok(result)
    }

    /// 启动后台编译。
    pub async fn start_compile(
        &self,
        record_id: &str,
    ) -> Result<JoinHandle<()>, ProvisioningError> {
        let record = self.load_record(record_id).await?;
        if !self.files.exists(&record.slug) {
            return Err(ProvisioningError::ConfigNotFound(record.slug));
        }
        let lease = self
            .leases
            .try_acquire(&record.slug)
            .ok_or_else(|| ProvisioningError::Busy(record.slug.clone()))?;
        Ok(self.spawn_compile(record, lease))
    }

    /// 以已持有的租约启动后台编译。
    pub(crate) fn spawn_compile(
        &self,
        record: ProvisioningRecord,
        lease: LeaseGuard,
    ) -> JoinHandle<()> {
        let orchestrator = self.clone();
        info!(
            target: "sites.build",
            record_id = %record.record_id,
            slug = %record.slug,
            "compile_started"
        );
        tokio::spawn(async move {
            let _lease = lease;
            orchestrator.run_compile(record).await;
        })
    }

    async fn run_compile(&self, record: ProvisioningRecord) {
        if !record
            .compile_status
            .can_transition_to(ProvisioningStatus::Compiling)
        {
            warn!(
                target: "sites.build",
                record_id = %record.record_id,
                status = record.compile_status.as_str(),
                "stale_compile_status_reset"
            );
        }
        self.write_compile(
            &record.record_id,
            CompileUpdate {
                status: ProvisioningStatus::Compiling,
                firmware_version: None,
                last_build: None,
                updated_at_ms: now_epoch_ms(),
            },
        )
        .await;

        let result = match self.compile(&record.slug).await {
            Ok(result) => result,
            Err(err) => BuildResult::failed(err.to_string()),
        };
        let now = now_epoch_ms();
        let (status, firmware_version) = if result.success {
            (ProvisioningStatus::Success, Some(format!("compiled_{now}")))
        } else {
            (ProvisioningStatus::Error, None)
        };
        self.write_compile(
            &record.record_id,
            CompileUpdate {
                status,
                firmware_version,
                last_build: Some(result),
                updated_at_ms: now,
            },
        )
        .await;
    }

    /// 启动后台烧录。
    ///
    /// 只有编译成功的记录可以烧录；请求携带的地址会写回记录，
    /// 未携带时使用记录上已有的地址。
    pub async fn start_upload(
        &self,
        record_id: &str,
        address: Option<String>,
    ) -> Result<JoinHandle<()>, ProvisioningError> {
        let record = self.load_record(record_id).await?;
        if record.compile_status != ProvisioningStatus::Success {
            return Err(ProvisioningError::NotCompiled(record.slug));
        }
        if !self.files.exists(&record.slug) {
            return Err(ProvisioningError::ConfigNotFound(record.slug));
        }
        let supplied = address
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let target = supplied.clone().or_else(|| record.ip_address.clone());
        if target.is_none() && self.config.upload_requires_address {
            return Err(ProvisioningError::AddressRequired);
        }
        let lease = self
            .leases
            .try_acquire(&record.slug)
            .ok_or_else(|| ProvisioningError::Busy(record.slug.clone()))?;

        let record = match supplied {
            Some(ip_address) => self
                .records
                .set_ip_address(&record.record_id, &ip_address, now_epoch_ms())
                .await
                .map_err(|err| ProvisioningError::Storage(err.to_string()))?
                .ok_or_else(|| ProvisioningError::NotFound(record.record_id.clone()))?,
            None => record,
        };

        let orchestrator = self.clone();
        info!(
            target: "sites.build",
            record_id = %record.record_id,
            slug = %record.slug,
            address = ?target,
            "upload_started"
        );
        Ok(tokio::spawn(async move {
            let _lease = lease;
            orchestrator.run_upload(record, target).await;
        }))
    }

    async fn run_upload(&self, record: ProvisioningRecord, address: Option<String>) {
        self.write_upload(
            &record.record_id,
            UploadUpdate {
                status: UploadStatus::Uploading,
                last_build: None,
                updated_at_ms: now_epoch_ms(),
            },
        )
        .await;

        let result = match self.upload(&record.slug, address).await {
            Ok(result) => result,
            Err(err) => BuildResult::failed(err.to_string()),
        };
        let success = result.success;
        let status = if success {
            UploadStatus::Uploaded
        } else {
            UploadStatus::Error
        };
        self.write_upload(
            &record.record_id,
            UploadUpdate {
                status,
                last_build: Some(result),
                updated_at_ms: now_epoch_ms(),
            },
        )
        .await;
        if success {
            self.materialize(&record).await;
        }
    }

    async fn materialize(&self, record: &ProvisioningRecord) {
        let template = match self.registry.get(&record.template_id) {
            Ok(template) => template,
            Err(err) => {
                warn!(target: "sites.build", slug = %record.slug, "materialize skipped: {}", err);
                return;
            }
        };
        if let Err(err) = self.materializer.materialize(record, template).await {
            warn!(target: "sites.build", slug = %record.slug, "materialize failed: {}", err);
        }
    }

    async fn load_record(&self, record_id: &str) -> Result<ProvisioningRecord, ProvisioningError> {
        self.records
            .find_record(record_id)
            .await
            .map_err(|err| ProvisioningError::Storage(err.to_string()))?
            .ok_or_else(|| ProvisioningError::NotFound(record_id.to_string()))
    }

    async fn write_compile(&self, record_id: &str, update: CompileUpdate) {
        let status = update.status;
        match self.records.update_compile(record_id, update).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(target: "sites.build", record_id = %record_id, "compile status target missing"),
            Err(err) => warn!(
                target: "sites.build",
                record_id = %record_id,
                status = status.as_str(),
                "compile status write failed: {}",
                err
            ),
        }
    }

    async fn write_upload(&self, record_id: &str, update: UploadUpdate) {
        let status = update.status;
        match self.records.update_upload(record_id, update).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(target: "sites.build", record_id = %record_id, "upload status target missing"),
            Err(err) => warn!(
                target: "sites.build",
                record_id = %record_id,
                status = status.as_str(),
                "upload status write failed: {}",
                err
            ),
        }
    }
}

fn elapsed_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}
