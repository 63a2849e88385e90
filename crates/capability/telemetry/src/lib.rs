//! 追踪、请求 ID 与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub provision_requests: u64,
    pub compile_started: u64,
    pub compile_success: u64,
    pub compile_failure: u64,
    pub compile_timeout: u64,
    pub upload_started: u64,
    pub upload_success: u64,
    pub upload_failure: u64,
    pub upload_timeout: u64,
    pub build_duration_ms_total: u64,
    pub build_duration_ms_count: u64,
    pub devices_materialized: u64,
    pub discovery_probes: u64,
    pub discovery_matches: u64,
    pub telemetry_messages: u64,
    pub telemetry_dropped: u64,
    pub telemetry_lookup_miss: u64,
    pub telemetry_history_appended: u64,
}

/// 进程级计数器。
pub struct ProvisioningMetrics {
    provision_requests: AtomicU64,
    compile_started: AtomicU64,
    compile_success: AtomicU64,
    compile_failure: AtomicU64,
    compile_timeout: AtomicU64,
    upload_started: AtomicU64,
    upload_success: AtomicU64,
    upload_failure: AtomicU64,
    upload_timeout: AtomicU64,
    build_duration_ms_total: AtomicU64,
    build_duration_ms_count: AtomicU64,
    devices_materialized: AtomicU64,
    discovery_probes: AtomicU64,
    discovery_matches: AtomicU64,
    telemetry_messages: AtomicU64,
    telemetry_dropped: AtomicU64,
    telemetry_lookup_miss: AtomicU64,
    telemetry_history_appended: AtomicU64,
}

impl Default for ProvisioningMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ProvisioningMetrics {
    pub fn new() -> Self {
        Self {
            provision_requests: AtomicU64::new(0),
            compile_started: AtomicU64::new(0),
            compile_success: AtomicU64::new(0),
            compile_failure: AtomicU64::new(0),
            compile_timeout: AtomicU64::new(0),
            upload_started: AtomicU64::new(0),
            upload_success: AtomicU64::new(0),
            upload_failure: AtomicU64::new(0),
            upload_timeout: AtomicU64::new(0),
            build_duration_ms_total: AtomicU64::new(0),
            build_duration_ms_count: AtomicU64::new(0),
            devices_materialized: AtomicU64::new(0),
            discovery_probes: AtomicU64::new(0),
            discovery_matches: AtomicU64::new(0),
            telemetry_messages: AtomicU64::new(0),
            telemetry_dropped: AtomicU64::new(0),
            telemetry_lookup_miss: AtomicU64::new(0),
            telemetry_history_appended: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            provision_requests: self.provision_requests.load(Ordering::Relaxed),
            compile_started: self.compile_started.load(Ordering::Relaxed),
            compile_success: self.compile_success.load(Ordering::Relaxed),
            compile_failure: self.compile_failure.load(Ordering::Relaxed),
            compile_timeout: self.compile_timeout.load(Ordering::Relaxed),
            upload_started: self.upload_started.load(Ordering::Relaxed),
            upload_success: self.upload_success.load(Ordering::Relaxed),
            upload_failure: self.upload_failure.load(Ordering::Relaxed),
            upload_timeout: self.upload_timeout.load(Ordering::Relaxed),
            build_duration_ms_total: self.build_duration_ms_total.load(Ordering::Relaxed),
            build_duration_ms_count: self.build_duration_ms_count.load(Ordering::Relaxed),
            devices_materialized: self.devices_materialized.load(Ordering::Relaxed),
            discovery_probes: self.discovery_probes.load(Ordering::Relaxed),
            discovery_matches: self.discovery_matches.load(Ordering::Relaxed),
            telemetry_messages: self.telemetry_messages.load(Ordering::Relaxed),
            telemetry_dropped: self.telemetry_dropped.load(Ordering::Relaxed),
            telemetry_lookup_miss: self.telemetry_lookup_miss.load(Ordering::Relaxed),
            telemetry_history_appended: self
                .telemetry_history_appended
                .load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<ProvisioningMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static ProvisioningMetrics {
    METRICS.get_or_init(ProvisioningMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录烧录请求次数。
pub fn record_provision_request() {
    metrics().provision_requests.fetch_add(1, Ordering::Relaxed);
}

pub fn record_compile_started() {
    metrics().compile_started.fetch_add(1, Ordering::Relaxed);
}

pub fn record_compile_success() {
    metrics().compile_success.fetch_add(1, Ordering::Relaxed);
}

pub fn record_compile_failure() {
    metrics().compile_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录编译超时次数（同时计入失败）。
pub fn record_compile_timeout() {
    let metrics = metrics();
    metrics.compile_timeout.fetch_add(1, Ordering::Relaxed);
    metrics.compile_failure.fetch_add(1, Ordering::Relaxed);
}

pub fn record_upload_started() {
    metrics().upload_started.fetch_add(1, Ordering::Relaxed);
}

pub fn record_upload_success() {
    metrics().upload_success.fetch_add(1, Ordering::Relaxed);
}

pub fn record_upload_failure() {
    metrics().upload_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录烧录超时次数（同时计入失败）。
pub fn record_upload_timeout() {
    let metrics = metrics();
    metrics.upload_timeout.fetch_add(1, Ordering::Relaxed);
    metrics.upload_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次工具链调用耗时（毫秒）。
pub fn record_build_duration_ms(duration_ms: u64) {
    let metrics = metrics();
    metrics
        .build_duration_ms_total
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .build_duration_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录烧录成功后新建设备次数。
pub fn record_device_materialized() {
    metrics().devices_materialized.fetch_add(1, Ordering::Relaxed);
}

/// 记录发现探测次数（每个地址一次）。
pub fn record_discovery_probes(count: u64) {
    metrics().discovery_probes.fetch_add(count, Ordering::Relaxed);
}

pub fn record_discovery_match() {
    metrics().discovery_matches.fetch_add(1, Ordering::Relaxed);
}

/// 记录遥测消息接收次数。
pub fn record_telemetry_message() {
    metrics().telemetry_messages.fetch_add(1, Ordering::Relaxed);
}

/// 记录队列满时丢弃的遥测消息。
pub fn record_telemetry_dropped() {
    metrics().telemetry_dropped.fetch_add(1, Ordering::Relaxed);
}

/// 记录设备或实体查找未命中次数。
pub fn record_telemetry_lookup_miss() {
    metrics()
        .telemetry_lookup_miss
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_telemetry_history_appended() {
    metrics()
        .telemetry_history_appended
        .fetch_add(1, Ordering::Relaxed);
}
