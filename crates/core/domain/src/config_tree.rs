//! 设备配置树。
//!
//! 配置文档是一棵带标签的树：标量（字符串/整数/浮点/布尔）、密钥引用、
//! 块映射与块列表。模板蓝图与生成后的完整配置都使用同一结构，
//! 占位符替换是对这棵树的一次递归变换。

use std::collections::BTreeMap;

/// 块映射（键有序，渲染结果稳定）。
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// 配置树节点。
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// 密钥引用，仅保存密钥名，渲染为 `!secret <name>`。
    Secret(String),
    Map(ConfigMap),
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn secret(name: impl Into<String>) -> Self {
        Self::Secret(name.into())
    }

    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ConfigValue)>,
        K: Into<String>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = ConfigValue>,
    {
        Self::List(items.into_iter().collect())
    }

    pub fn empty_map() -> Self {
        Self::Map(ConfigMap::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ConfigMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// 取映射节点下的子节点；非映射节点返回 None。
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// 递归替换占位符。
    ///
    /// 仅当字符串整体是 `{role}` 形式时才视为占位符；`lookup` 返回 `None`
    /// 时该节点保持原样（由调用方在替换后检查残留）。
    pub fn substitute<F>(&self, lookup: &F) -> ConfigValue
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Self::String(text) => match placeholder_name(text).and_then(lookup) {
                Some(bound) => Self::String(bound),
                None => self.clone(),
            },
            Self::Map(map) => Self::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.substitute(lookup)))
                    .collect(),
            ),
            Self::List(items) => Self::List(items.iter().map(|item| item.substitute(lookup)).collect()),
            other => other.clone(),
        }
    }

    /// 收集树中残留的占位符名（按出现顺序，可能重复）。
    pub fn placeholders(&self) -> Vec<String> {
        let mut found = Vec::new();
        self.collect_placeholders(&mut found);
        found
    }

    fn collect_placeholders(&self, found: &mut Vec<String>) {
        match self {
            Self::String(text) => {
                if let Some(name) = placeholder_name(text) {
                    found.push(name.to_string());
                }
            }
            Self::Map(map) => {
                for value in map.values() {
                    value.collect_placeholders(found);
                }
            }
            Self::List(items) => {
                for item in items {
                    item.collect_placeholders(found);
                }
            }
            _ => {}
        }
    }
}

/// 解析整串占位符 `{name}`，返回 name。
///
/// name 只允许 ASCII 字母数字与下划线，避免把普通文本里的花括号当成占位符。
pub fn placeholder_name(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty()
        || !inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    Some(inner)
}
