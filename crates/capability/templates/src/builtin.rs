//! 内置设备模板目录（工地监测常用传感器）。

use domain::{ConfigMap, ConfigValue, DeviceTemplate, PinKind, PinSpec};

pub(crate) fn catalog() -> Vec<DeviceTemplate> {
    vec![
        motion_sensor(),
        light_sensor(),
        air_quality(),
        noise_monitor(),
        power_monitor(),
        door_window_sensor(),
    ]
}

fn pin(role: &str, kind: PinKind, default: &str, required: bool) -> PinSpec {
    PinSpec {
        role: role.to_string(),
        kind,
        default: default.to_string(),
        required,
    }
}

fn s(value: &str) -> ConfigValue {
    ConfigValue::str(value)
}

fn blueprint(family: &str, block: ConfigValue) -> ConfigMap {
    let mut map = ConfigMap::new();
    map.insert(family.to_string(), ConfigValue::list([block]));
    map
}

fn template(
    id: &str,
    name: &str,
    description: &str,
    family: &str,
    pins: Vec<PinSpec>,
    block: ConfigValue,
) -> DeviceTemplate {
    DeviceTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        sensors: vec![family.to_string()],
        pins,
        blueprint: blueprint(family, block),
    }
}

fn motion_sensor() -> DeviceTemplate {
    template(
        "motion_sensor",
        "Motion Sensor",
        "PIR or mmWave motion detection for construction site monitoring",
        "binary_sensor",
        vec![pin("motion_pin", PinKind::Digital, "GPIO2", true)],
        ConfigValue::map([
            ("platform", s("gpio")),
            ("pin", s("{motion_pin}")),
            ("name", s("Motion")),
            ("device_class", s("motion")),
            (
                "filters",
                ConfigValue::list([ConfigValue::map([("delayed_off", s("10s"))])]),
            ),
        ]),
    )
}

fn light_sensor() -> DeviceTemplate {
    template(
        "light_sensor",
        "Light Sensor",
        "Ambient light monitoring with LDR or BH1750",
        "sensor",
        vec![pin("light_pin", PinKind::Analog, "A0", true)],
        ConfigValue::map([
            ("platform", s("adc")),
            ("pin", s("{light_pin}")),
            ("name", s("Light Level")),
            ("unit_of_measurement", s("V")),
            ("update_interval", s("30s")),
            (
                "filters",
                ConfigValue::list([
                    ConfigValue::map([("multiply", ConfigValue::Float(3.3))]),
                    ConfigValue::map([("lambda", s("return (x / 3.3) * 100;"))]),
                ]),
            ),
        ]),
    )
}

fn air_quality() -> DeviceTemplate {
    template(
        "air_quality",
        "Air Quality Monitor",
        "Temperature, humidity, and air quality monitoring",
        "sensor",
        vec![
            pin("dht_pin", PinKind::Digital, "GPIO4", true),
            pin("mq135_pin", PinKind::Analog, "A0", false),
        ],
        ConfigValue::map([
            ("platform", s("dht")),
            ("pin", s("{dht_pin}")),
            ("model", s("DHT22")),
            (
                "temperature",
                ConfigValue::map([
                    ("name", s("Temperature")),
                    ("unit_of_measurement", s("°C")),
                ]),
            ),
            (
                "humidity",
                ConfigValue::map([("name", s("Humidity")), ("unit_of_measurement", s("%"))]),
            ),
            ("update_interval", s("30s")),
        ]),
    )
}

fn noise_monitor() -> DeviceTemplate {
    template(
        "noise_monitor",
        "Noise Level Monitor",
        "Sound level monitoring for construction site noise control",
        "sensor",
        vec![pin("microphone_pin", PinKind::Analog, "A0", true)],
        ConfigValue::map([
            ("platform", s("adc")),
            ("pin", s("{microphone_pin}")),
            ("name", s("Noise Level")),
            ("unit_of_measurement", s("dB")),
            ("update_interval", s("5s")),
            (
                "filters",
                ConfigValue::list([
                    ConfigValue::map([(
                        "sliding_window_moving_average",
                        ConfigValue::map([
                            ("window_size", ConfigValue::Integer(10)),
                            ("send_every", ConfigValue::Integer(5)),
                        ]),
                    )]),
                    // 粗略换算为 dB
                    ConfigValue::map([("lambda", s("return (x * 50) + 30;"))]),
                ]),
            ),
        ]),
    )
}

fn power_monitor() -> DeviceTemplate {
    template(
        "power_monitor",
        "Power Monitor",
        "CT clamp power monitoring for electrical consumption",
        "sensor",
        vec![pin("ct_pin", PinKind::Analog, "A0", true)],
        ConfigValue::map([
            ("platform", s("ct_clamp")),
            ("pin", s("{ct_pin}")),
            ("name", s("Power Consumption")),
            ("unit_of_measurement", s("W")),
            ("update_interval", s("10s")),
            ("sample_duration", s("200ms")),
            (
                "filters",
                ConfigValue::list([ConfigValue::map([(
                    "calibrate_linear",
                    ConfigValue::list([
                        ConfigValue::map([("0.0V", s("0W"))]),
                        ConfigValue::map([("1.0V", s("1000W"))]),
                    ]),
                )])]),
            ),
        ]),
    )
}

fn door_window_sensor() -> DeviceTemplate {
    template(
        "door_window_sensor",
        "Door/Window Sensor",
        "Magnetic reed switch for door/window monitoring",
        "binary_sensor",
        vec![pin("reed_pin", PinKind::Digital, "GPIO2", true)],
        ConfigValue::map([
            ("platform", s("gpio")),
            (
                "pin",
                ConfigValue::map([("number", s("{reed_pin}")), ("mode", s("INPUT_PULLUP"))]),
            ),
            ("name", s("Door Status")),
            ("device_class", s("door")),
            (
                "filters",
                ConfigValue::list([
                    ConfigValue::map([("delayed_on", s("100ms"))]),
                    ConfigValue::map([("delayed_off", s("100ms"))]),
                ]),
            ),
        ]),
    )
}
