//! 设备配置生成。
//!
//! 模板蓝图 + 设备身份 + 引脚绑定 → 完整配置树 → YAML 文本 → 配置文件。

mod file_store;
mod render;

pub use file_store::ConfigFileStore;
pub use render::render_yaml;

use domain::{
    ConfigMap, ConfigValue, DeviceTemplate, GeneratedConfig, ProvisioningRequest, slugify,
};
use sites_secrets::SecretRefs;
use sites_templates::{TemplateError, TemplateRegistry};
use std::path::PathBuf;

/// 配置生成错误。
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("unknown device template: {0}")]
    UnknownTemplate(String),
    #[error("template {template} requires pin {role}")]
    MissingRequiredPin { template: String, role: String },
    #[error("template {template} has no pin {role}")]
    UnknownPinRole { template: String, role: String },
    #[error("unresolved placeholders: {}", .0.join(", "))]
    UnresolvedPlaceholder(Vec<String>),
    #[error("device name {0:?} yields an empty slug")]
    InvalidName(String),
    #[error("render config failed: {0}")]
    Render(#[from] serde_yaml::Error),
    #[error("config file io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<TemplateError> for GenerateError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::UnknownTemplate(id) => GenerateError::UnknownTemplate(id),
        }
    }
}

/// 生成器的固定参数（来自运行配置）。
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// MQTT topic 命名空间，设备前缀为 `<namespace>/<slug>`。
    pub namespace: String,
    pub platform: String,
    pub board: String,
    pub fallback_ap_password: String,
    pub mqtt_port: u16,
    pub web_server_port: u16,
    pub logger_level: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            namespace: "smartsites".to_string(),
            platform: "ESP32".to_string(),
            board: "esp32dev".to_string(),
            fallback_ap_password: "smartsites123".to_string(),
            mqtt_port: 1883,
            web_server_port: 80,
            logger_level: "INFO".to_string(),
        }
    }
}

/// 配置生成器。
#[derive(Debug, Clone)]
pub struct ConfigGenerator {
    settings: GeneratorSettings,
}

impl ConfigGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// 按模板 id 查找模板后生成。
    pub fn generate_from_registry(
        &self,
        registry: &TemplateRegistry,
        request: &ProvisioningRequest,
        refs: &SecretRefs,
    ) -> Result<GeneratedConfig, GenerateError> {
        let template = registry.get(&request.template_id)?;
        self.generate(request, template, refs)
    }

    /// 生成完整配置。
    ///
    /// 必填引脚缺失或绑定了模板没有的引脚时失败；可选引脚未绑定时取模板默认值。
    /// 返回的配置不含任何未解析占位符。
    pub fn generate(
        &self,
        request: &ProvisioningRequest,
        template: &DeviceTemplate,
        refs: &SecretRefs,
    ) -> Result<GeneratedConfig, GenerateError> {
        let slug = slugify(&request.name);
        if slug.is_empty() {
            return Err(GenerateError::InvalidName(request.name.clone()));
        }

        let bound = |role: &str| {
            request
                .pins
                .get(role)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        if let Some(missing) = template.required_pins().find(|pin| bound(&pin.role).is_none()) {
            return Err(GenerateError::MissingRequiredPin {
                template: template.id.clone(),
                role: missing.role.clone(),
            });
        }
        if let Some(role) = request.pins.keys().find(|role| template.pin(role).is_none()) {
            return Err(GenerateError::UnknownPinRole {
                template: template.id.clone(),
                role: role.clone(),
            });
        }

        let lookup = |role: &str| {
            bound(role).or_else(|| template.pin(role).map(|pin| pin.default.clone()))
        };
        let mut document = self.base_document(&request.name, &slug, refs);
        for (family, blocks) in &template.blueprint {
            document.insert(family.clone(), blocks.substitute(&lookup));
        }

        let config = GeneratedConfig { slug, document };
        let unresolved = config.unresolved_placeholders();
        if !unresolved.is_empty() {
            return Err(GenerateError::UnresolvedPlaceholder(unresolved));
        }
        tracing::info!(
            target: "sites.generator",
            slug = %config.slug,
            template = %template.id,
            "config_generated"
        );
        Ok(config)
    }

    fn base_document(&self, name: &str, slug: &str, refs: &SecretRefs) -> ConfigMap {
        let settings = &self.settings;
        let topic_prefix = format!("{}/{}", settings.namespace.trim_end_matches('/'), slug);
        let document = ConfigValue::map([
            (
                "esphome",
                ConfigValue::map([
                    ("name", ConfigValue::str(slug)),
                    ("platform", ConfigValue::str(&settings.platform)),
                    ("board", ConfigValue::str(&settings.board)),
                ]),
            ),
            (
                "wifi",
                ConfigValue::map([
                    ("ssid", ConfigValue::secret(&refs.wifi_ssid)),
                    ("password", ConfigValue::secret(&refs.wifi_password)),
                    (
                        "ap",
                        ConfigValue::map([
                            ("ssid", ConfigValue::str(format!("{name} Fallback"))),
                            ("password", ConfigValue::str(&settings.fallback_ap_password)),
                        ]),
                    ),
                ]),
            ),
            ("captive_portal", ConfigValue::empty_map()),
            (
                "logger",
                ConfigValue::map([("level", ConfigValue::str(&settings.logger_level))]),
            ),
            (
                "api",
                ConfigValue::map([(
                    "encryption",
                    ConfigValue::map([("key", ConfigValue::secret(&refs.api_encryption_key))]),
                )]),
            ),
            (
                "ota",
                ConfigValue::map([("password", ConfigValue::secret(&refs.ota_password))]),
            ),
            (
                "mqtt",
                ConfigValue::map([
                    ("broker", ConfigValue::secret(&refs.mqtt_broker)),
                    ("port", ConfigValue::Integer(i64::from(settings.mqtt_port))),
                    ("username", ConfigValue::secret(&refs.mqtt_username)),
                    ("password", ConfigValue::secret(&refs.mqtt_password)),
                    ("topic_prefix", ConfigValue::str(topic_prefix)),
                    ("discovery", ConfigValue::Bool(true)),
                ]),
            ),
            (
                "web_server",
                ConfigValue::map([(
                    "port",
                    ConfigValue::Integer(i64::from(settings.web_server_port)),
                )]),
            ),
            (
                "time",
                ConfigValue::map([
                    ("platform", ConfigValue::str("sntp")),
                    ("id", ConfigValue::str("my_time")),
                ]),
            ),
        ]);
        match document {
            ConfigValue::Map(map) => map,
            _ => ConfigMap::new(),
        }
    }
}
