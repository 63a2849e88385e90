//! 配置树 → YAML。

use crate::GenerateError;
use domain::{ConfigMap, ConfigValue};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};

const SECRET_TAG: &str = "secret";

/// 渲染为 YAML 文本。键按字典序输出，密钥引用输出为 `!secret <name>`。
pub fn render_yaml(document: &ConfigMap) -> Result<String, GenerateError> {
    let value = map_to_yaml(document);
    Ok(serde_yaml::to_string(&value)?)
}

fn map_to_yaml(map: &ConfigMap) -> Value {
    let mut mapping = Mapping::new();
    for (key, value) in map {
        mapping.insert(Value::String(key.clone()), to_yaml(value));
    }
    Value::Mapping(mapping)
}

fn to_yaml(value: &ConfigValue) -> Value {
    match value {
        ConfigValue::String(text) => Value::String(text.clone()),
        ConfigValue::Integer(number) => Value::Number((*number).into()),
        ConfigValue::Float(number) => Value::Number((*number).into()),
        ConfigValue::Bool(flag) => Value::Bool(*flag),
        ConfigValue::Secret(name) => Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(SECRET_TAG),
            value: Value::String(name.clone()),
        })),
        ConfigValue::Map(map) => map_to_yaml(map),
        ConfigValue::List(items) => Value::Sequence(items.iter().map(to_yaml).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_renders_as_tag() {
        let mut doc = ConfigMap::new();
        doc.insert(
            "wifi".to_string(),
            ConfigValue::map([("ssid", ConfigValue::secret("wifi_ssid"))]),
        );
        let yaml = render_yaml(&doc).expect("render");
        assert!(yaml.contains("ssid: !secret wifi_ssid"), "{yaml}");
        assert!(!yaml.contains("'!secret"), "{yaml}");
    }

    #[test]
    fn keys_are_sorted_and_empty_map_is_inline() {
        let mut doc = ConfigMap::new();
        doc.insert("wifi".to_string(), ConfigValue::empty_map());
        doc.insert("captive_portal".to_string(), ConfigValue::empty_map());
        doc.insert("api".to_string(), ConfigValue::map([("port", ConfigValue::Integer(80))]));
        let yaml = render_yaml(&doc).expect("render");
        let api = yaml.find("api:").expect("api");
        let portal = yaml.find("captive_portal:").expect("portal");
        let wifi = yaml.find("wifi:").expect("wifi");
        assert!(api < portal && portal < wifi, "{yaml}");
        assert!(yaml.contains("captive_portal: {}"), "{yaml}");
    }
}
