//! 应用运行配置加载。

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未配置时使用内存存储。
    pub database_url: Option<String>,
    pub esphome_dir: PathBuf,
    pub config_dir: PathBuf,
    pub build_dir: PathBuf,
    pub esphome_bin: String,
    pub compile_timeout: Duration,
    pub upload_timeout: Duration,
    pub upload_requires_address: bool,
    pub device_platform: String,
    pub device_board: String,
    pub fallback_ap_password: String,
    pub mqtt_namespace: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub ingest_enabled: bool,
    pub ingest_queue_capacity: usize,
    pub ingest_max_backoff_ms: u64,
    pub discovery_port: u16,
    pub discovery_connect_timeout: Duration,
    pub discovery_http_timeout: Duration,
    pub discovery_concurrency: usize,
    pub discovery_signature: String,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr =
            env::var("SITES_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("SITES_DATABASE_URL");
        if database_url.is_none() && read_bool_with_default("SITES_REQUIRE_DATABASE", false) {
            return Err(ConfigError::Missing("SITES_DATABASE_URL".to_string()));
        }
        let esphome_dir = PathBuf::from(
            env::var("SITES_ESPHOME_DIR").unwrap_or_else(|_| "/opt/smart-sites/esphome".to_string()),
        );
        let config_dir = read_optional("SITES_ESPHOME_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| esphome_dir.join("config"));
        let build_dir = read_optional("SITES_ESPHOME_BUILD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| esphome_dir.join("build"));
        let esphome_bin = env::var("SITES_ESPHOME_BIN").unwrap_or_else(|_| "esphome".to_string());
        let compile_timeout =
            Duration::from_secs(read_u64_with_default("SITES_COMPILE_TIMEOUT_SECONDS", 600)?);
        let upload_timeout =
            Duration::from_secs(read_u64_with_default("SITES_UPLOAD_TIMEOUT_SECONDS", 300)?);
        let upload_requires_address = read_bool_with_default("SITES_UPLOAD_REQUIRES_ADDRESS", false);
        let device_platform =
            env::var("SITES_DEVICE_PLATFORM").unwrap_or_else(|_| "ESP32".to_string());
        let device_board = env::var("SITES_DEVICE_BOARD").unwrap_or_else(|_| "esp32dev".to_string());
        let fallback_ap_password =
            env::var("SITES_FALLBACK_AP_PASSWORD").unwrap_or_else(|_| "smartsites123".to_string());
        let mqtt_namespace = env::var("SITES_MQTT_NAMESPACE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "smartsites".to_string());
        let mqtt_host = env::var("SITES_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("SITES_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("SITES_MQTT_USERNAME");
        let mqtt_password = read_optional("SITES_MQTT_PASSWORD");
        let ingest_enabled = read_bool_with_default("SITES_INGEST", false);
        let ingest_queue_capacity =
            read_u64_with_default("SITES_INGEST_QUEUE_CAPACITY", 256)?.max(1) as usize;
        let ingest_max_backoff_ms = read_u64_with_default("SITES_INGEST_MAX_BACKOFF_MS", 30_000)?;
        let discovery_port = read_u16_with_default("SITES_DISCOVERY_PORT", 80)?;
        let discovery_connect_timeout = Duration::from_millis(read_u64_with_default(
            "SITES_DISCOVERY_CONNECT_TIMEOUT_MS",
            1_000,
        )?);
        let discovery_http_timeout =
            Duration::from_millis(read_u64_with_default("SITES_DISCOVERY_HTTP_TIMEOUT_MS", 2_000)?);
        let discovery_concurrency =
            read_u64_with_default("SITES_DISCOVERY_CONCURRENCY", 50)?.max(1) as usize;
        let discovery_signature =
            env::var("SITES_DISCOVERY_SIGNATURE").unwrap_or_else(|_| "ESPHome".to_string());

        Ok(Self {
            http_addr,
            database_url,
            esphome_dir,
            config_dir,
            build_dir,
            esphome_bin,
            compile_timeout,
            upload_timeout,
            upload_requires_address,
            device_platform,
            device_board,
            fallback_ap_password,
            mqtt_namespace,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            ingest_enabled,
            ingest_queue_capacity,
            ingest_max_backoff_ms,
            discovery_port,
            discovery_connect_timeout,
            discovery_http_timeout,
            discovery_concurrency,
            discovery_signature,
        })
    }

    /// 密钥文件路径（与设备配置同目录，`!secret` 按配置文件相对路径解析）。
    pub fn secrets_file(&self) -> PathBuf {
        self.config_dir.join("secrets.yaml")
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
