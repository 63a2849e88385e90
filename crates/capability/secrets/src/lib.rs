//! 烧录密钥存储。
//!
//! 每个安装只生成一次 `secrets.yaml`：随机 API 加密密钥、随机 OTA 口令，
//! 以及需要运维填写的网络与 broker 占位值。生成的设备配置只按名称引用这些值。

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// 密钥名（与 secrets.yaml 的键一致）。
pub mod names {
    pub const WIFI_SSID: &str = "wifi_ssid";
    pub const WIFI_PASSWORD: &str = "wifi_password";
    pub const API_ENCRYPTION_KEY: &str = "api_encryption_key";
    pub const OTA_PASSWORD: &str = "ota_password";
    pub const MQTT_BROKER: &str = "mqtt_broker";
    pub const MQTT_USERNAME: &str = "mqtt_username";
    pub const MQTT_PASSWORD: &str = "mqtt_password";
}

const API_KEY_BYTES: usize = 32;
const OTA_PASSWORD_LEN: usize = 12;

/// 密钥存储错误。
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    #[error("secrets io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("secrets file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// 密钥值。`Debug` 输出脱敏。
#[derive(Clone, Serialize, Deserialize)]
pub struct Secrets {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub api_encryption_key: String,
    pub ota_password: String,
    pub mqtt_broker: String,
    pub mqtt_username: String,
    pub mqtt_password: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("wifi_ssid", &"***")
            .field("wifi_password", &"***")
            .field("api_encryption_key", &"***")
            .field("ota_password", &"***")
            .field("mqtt_broker", &"***")
            .field("mqtt_username", &"***")
            .field("mqtt_password", &"***")
            .finish()
    }
}

impl Secrets {
    /// 新生成一份密钥：随机部分取自系统随机源，其余为待填写占位值。
    pub fn generate() -> Self {
        let mut key = [0u8; API_KEY_BYTES];
        OsRng.fill_bytes(&mut key);
        Self {
            wifi_ssid: "YourWiFiNetwork".to_string(),
            wifi_password: "YourWiFiPassword".to_string(),
            api_encryption_key: hex::encode(key),
            ota_password: OsRng
                .sample_iter(&Alphanumeric)
                .take(OTA_PASSWORD_LEN)
                .map(char::from)
                .collect(),
            mqtt_broker: "192.168.1.100".to_string(),
            mqtt_username: "smartsites".to_string(),
            mqtt_password: "smartsites123".to_string(),
        }
    }
}

/// 生成配置时使用的密钥名集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRefs {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub api_encryption_key: String,
    pub ota_password: String,
    pub mqtt_broker: String,
    pub mqtt_username: String,
    pub mqtt_password: String,
}

impl Default for SecretRefs {
    fn default() -> Self {
        Self {
            wifi_ssid: names::WIFI_SSID.to_string(),
            wifi_password: names::WIFI_PASSWORD.to_string(),
            api_encryption_key: names::API_ENCRYPTION_KEY.to_string(),
            ota_password: names::OTA_PASSWORD.to_string(),
            mqtt_broker: names::MQTT_BROKER.to_string(),
            mqtt_username: names::MQTT_USERNAME.to_string(),
            mqtt_password: names::MQTT_PASSWORD.to_string(),
        }
    }
}

/// `ensure` 的结果：文件位置与可引用的密钥名。
#[derive(Debug, Clone)]
pub struct SecretsHandle {
    pub path: PathBuf,
    pub refs: SecretRefs,
    /// 本次调用是否新建了文件。
    pub created: bool,
}

/// 基于文件的密钥存储。
#[derive(Debug, Clone)]
pub struct SecretsStore {
    path: PathBuf,
}

impl SecretsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 确保密钥文件存在。已有文件保持原样，不会被重写；但必须能完整解析，
    /// 否则返回 `Malformed`，由运维修复或删除后重新生成。
    pub fn ensure(&self) -> Result<SecretsHandle, SecretsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let created = match self.create_new() {
            Ok(()) => true,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => false,
            Err(source) => return Err(self.io_error(source)),
        };
        if created {
            tracing::info!(
                target: "sites.secrets",
                path = %self.path.display(),
                "secrets_file_created"
            );
        } else {
            self.load()?;
        }
        Ok(SecretsHandle {
            path: self.path.clone(),
            refs: SecretRefs::default(),
            created,
        })
    }

    /// 读取现有密钥。
    pub fn load(&self) -> Result<Secrets, SecretsError> {
        let text = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        serde_yaml::from_str(&text).map_err(|source| SecretsError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    /// 先完整写入同目录临时文件，再以硬链接发布到目标路径。
    ///
    /// 硬链接在目标已存在时失败（`AlreadyExists`），目标路径上只会出现完整文件。
    fn create_new(&self) -> std::io::Result<()> {
        if self.path.exists() {
            return Err(ErrorKind::AlreadyExists.into());
        }
        let yaml = serde_yaml::to_string(&Secrets::generate())
            .map_err(|err| std::io::Error::new(ErrorKind::InvalidData, err))?;
        let tmp = self.temp_path();
        let published =
            write_private(&tmp, yaml.as_bytes()).and_then(|()| fs::hard_link(&tmp, &self.path));
        let _ = fs::remove_file(&tmp);
        published
    }

    fn temp_path(&self) -> PathBuf {
        let suffix: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        let name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "secrets.yaml".to_string());
        self.path.with_file_name(format!(".{name}.{suffix}.tmp"))
    }

    fn io_error(&self, source: std::io::Error) -> SecretsError {
        SecretsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// 以 0600 新建并写入文件，落盘后返回。
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
