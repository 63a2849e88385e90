//! 设备模板（设备原型）。

use crate::config_tree::{ConfigMap, ConfigValue};

/// 引脚类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    Digital,
    Analog,
}

impl PinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinKind::Digital => "digital",
            PinKind::Analog => "analog",
        }
    }
}

/// 引脚角色定义。
#[derive(Debug, Clone)]
pub struct PinSpec {
    pub role: String,
    pub kind: PinKind,
    pub default: String,
    pub required: bool,
}

/// 设备模板：元信息、引脚角色与参数化蓝图。
#[derive(Debug, Clone)]
pub struct DeviceTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    /// 模板声明的组件族（如 `sensor`、`binary_sensor`）。
    pub sensors: Vec<String>,
    pub pins: Vec<PinSpec>,
    pub blueprint: ConfigMap,
}

/// 蓝图中声明的实体（每个带 name 的传感器块）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredEntity {
    pub name: String,
    pub entity_type: String,
    pub unit: Option<String>,
}

impl DeviceTemplate {
    pub fn pin(&self, role: &str) -> Option<&PinSpec> {
        self.pins.iter().find(|pin| pin.role == role)
    }

    pub fn required_pins(&self) -> impl Iterator<Item = &PinSpec> {
        self.pins.iter().filter(|pin| pin.required)
    }

    /// 列出蓝图声明的实体。
    ///
    /// 遍历每个组件族下的块（单块或块列表）：块自身带 `name` 记为一个实体；
    /// 块内一层嵌套的命名子块（如 DHT 的 temperature/humidity）各记一个实体。
    pub fn declared_entities(&self) -> Vec<DeclaredEntity> {
        let mut entities = Vec::new();
        for (family, blocks) in &self.blueprint {
            let blocks: Vec<&ConfigMap> = match blocks {
                ConfigValue::Map(block) => vec![block],
                ConfigValue::List(items) => items.iter().filter_map(ConfigValue::as_map).collect(),
                _ => continue,
            };
            for block in blocks {
                if let Some(entity) = named_block(family, block) {
                    entities.push(entity);
                }
                for nested in block.values().filter_map(ConfigValue::as_map) {
                    if let Some(entity) = named_block(family, nested) {
                        entities.push(entity);
                    }
                }
            }
        }
        entities
    }
}

fn named_block(family: &str, block: &ConfigMap) -> Option<DeclaredEntity> {
    let name = block.get("name").and_then(ConfigValue::as_str)?;
    Some(DeclaredEntity {
        name: name.to_string(),
        entity_type: family.to_string(),
        unit: block
            .get("unit_of_measurement")
            .and_then(ConfigValue::as_str)
            .map(str::to_string),
    })
}
