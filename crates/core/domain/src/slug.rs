//! 设备 slug 规则。

/// 由显示名派生 slug：转小写，空白与连字符替换为下划线，
/// 去掉 ASCII 字母数字与下划线以外的字符。
///
/// slug 同时用作配置文件名、MQTT topic 前缀与实体名，结果对自身幂等。
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slug_strips_punctuation() {
        assert_eq!(slugify("Front Door Sensor!"), "front_door_sensor");
        assert_eq!(slugify("Crane-01 Power"), "crane_01_power");
        assert_eq!(slugify("Büro Licht"), "bro_licht");
    }

    #[test]
    fn slug_is_idempotent() {
        for name in ["Front Door Sensor!", "  Gate  A ", "noise-monitor #2", "already_slug", ""] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "name: {name}");
        }
    }
}
