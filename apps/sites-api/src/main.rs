//! 设备烧录 HTTP API：模板、配置生成、编译/烧录任务、发现扫描与计数器。

mod handlers;
mod routes;
mod utils;

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use sites_config::AppConfig;
use sites_discovery::{DiscoveryConfig, Scanner};
use sites_generator::{ConfigFileStore, ConfigGenerator, GeneratorSettings};
use sites_ingest::{MqttSource, MqttSourceConfig, StoreTelemetryHandler};
use sites_provisioning::{BuildConfig, BuildOrchestrator, DeviceMaterializer, ProvisioningService};
use sites_secrets::SecretsStore;
use sites_storage::{
    DeviceStore, EntityStore, HistoryStore, InMemoryDeviceStore, InMemoryEntityStore,
    InMemoryHistoryStore, InMemoryProvisioningStore, PgDeviceStore, PgEntityStore,
    PgHistoryStore, PgProvisioningStore, ProvisioningStore, connect_pool,
};
use sites_telemetry::{init_tracing, new_request_ids};
use sites_templates::TemplateRegistry;
use sites_toolchain::ProcessToolchain;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, info};

/// 进程上下文：启动时构建一次，显式传给各 handler。
#[derive(Clone)]
pub struct AppState {
    pub provisioning: ProvisioningService,
    pub scanner: Scanner,
}

/// 存储实现集合。
struct Stores {
    records: Arc<dyn ProvisioningStore>,
    devices: Arc<dyn DeviceStore>,
    entities: Arc<dyn EntityStore>,
    history: Arc<dyn HistoryStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let stores = build_stores(&config).await?;
    std::fs::create_dir_all(&config.config_dir)?;
    std::fs::create_dir_all(&config.build_dir)?;

    // 首次启动生成 secrets.yaml；已存在则原样保留
    let secrets = SecretsStore::new(config.secrets_file()).ensure()?;
    info!(
        target: "sites.api",
        path = %secrets.path.display(),
        created = secrets.created,
        "secrets_ready"
    );

    let registry = Arc::new(TemplateRegistry::builtin());
    let generator = ConfigGenerator::new(GeneratorSettings {
        namespace: config.mqtt_namespace.clone(),
        platform: config.device_platform.clone(),
        board: config.device_board.clone(),
        fallback_ap_password: config.fallback_ap_password.clone(),
        mqtt_port: config.mqtt_port,
        ..GeneratorSettings::default()
    });
    let files = ConfigFileStore::new(&config.config_dir);
    let toolchain = ProcessToolchain::new(&config.esphome_bin).with_working_dir(&config.esphome_dir);
    let orchestrator = BuildOrchestrator::new(
        Arc::new(toolchain),
        files.clone(),
        stores.records.clone(),
        registry.clone(),
        DeviceMaterializer::new(stores.devices.clone(), stores.entities.clone()),
        BuildConfig {
            compile_timeout: config.compile_timeout,
            upload_timeout: config.upload_timeout,
            upload_requires_address: config.upload_requires_address,
        },
    );
    let provisioning = ProvisioningService::new(
        registry,
        generator,
        secrets.refs,
        files,
        stores.records.clone(),
        orchestrator,
    );

    let scanner = Scanner::http(&DiscoveryConfig {
        port: config.discovery_port,
        connect_timeout: config.discovery_connect_timeout,
        http_timeout: config.discovery_http_timeout,
        concurrency: config.discovery_concurrency,
        signature: config.discovery_signature.clone(),
    })?;

    // 实时遥测接入（可选）
    if config.ingest_enabled {
        let handler = StoreTelemetryHandler::new(
            config.mqtt_namespace.clone(),
            stores.devices.clone(),
            stores.entities.clone(),
            stores.history.clone(),
        );
        let source = MqttSource::new(MqttSourceConfig {
            host: config.mqtt_host.clone(),
            port: config.mqtt_port,
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            namespace: config.mqtt_namespace.clone(),
            queue_capacity: config.ingest_queue_capacity,
            max_backoff: Duration::from_millis(config.ingest_max_backoff_ms),
        });
        let _ingest_task = source.spawn(Arc::new(handler));
    }

    let state = AppState {
        provisioning,
        scanner,
    };
    let app = routes::create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "sites.api", addr = %config.http_addr, "http_listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn build_stores(config: &AppConfig) -> Result<Stores, Box<dyn std::error::Error>> {
    match &config.database_url {
        Some(url) => {
            // Postgres 存储（需先执行 migrations/）
            let pool = connect_pool(url).await?;
            Ok(Stores {
                records: Arc::new(PgProvisioningStore::new(pool.clone())),
                devices: Arc::new(PgDeviceStore::new(pool.clone())),
                entities: Arc::new(PgEntityStore::new(pool.clone())),
                history: Arc::new(PgHistoryStore::new(pool)),
            })
        }
        None => {
            info!(target: "sites.api", "database url not set, using in-memory stores");
            Ok(Stores {
                records: Arc::new(InMemoryProvisioningStore::new()),
                devices: Arc::new(InMemoryDeviceStore::new()),
                entities: Arc::new(InMemoryEntityStore::new()),
                history: Arc::new(InMemoryHistoryStore::new()),
            })
        }
    }
}

async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    // 生成 request_id 与 trace_id，并注入请求扩展与日志
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}
