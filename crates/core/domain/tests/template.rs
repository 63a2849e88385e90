use domain::{ConfigValue, DeviceTemplate, PinKind, PinSpec, ProvisioningStatus};

fn dht_template() -> DeviceTemplate {
    let blueprint = ConfigValue::map([(
        "sensor",
        ConfigValue::list([ConfigValue::map([
            ("platform", ConfigValue::str("dht")),
            ("pin", ConfigValue::str("{dht_pin}")),
            (
                "temperature",
                ConfigValue::map([
                    ("name", ConfigValue::str("Temperature")),
                    ("unit_of_measurement", ConfigValue::str("°C")),
                ]),
            ),
            (
                "humidity",
                ConfigValue::map([
                    ("name", ConfigValue::str("Humidity")),
                    ("unit_of_measurement", ConfigValue::str("%")),
                ]),
            ),
        ])]),
    )]);
    let ConfigValue::Map(blueprint) = blueprint else {
        unreachable!("map literal");
    };
    DeviceTemplate {
        id: "air_quality".to_string(),
        name: "Air Quality Monitor".to_string(),
        description: "".to_string(),
        sensors: vec!["sensor".to_string()],
        pins: vec![PinSpec {
            role: "dht_pin".to_string(),
            kind: PinKind::Digital,
            default: "GPIO4".to_string(),
            required: true,
        }],
        blueprint,
    }
}

#[test]
fn declared_entities_include_nested_named_blocks() {
    let template = dht_template();
    let entities = template.declared_entities();
    let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Humidity", "Temperature"]);
    assert!(entities.iter().all(|e| e.entity_type == "sensor"));
    assert_eq!(entities[0].unit.as_deref(), Some("%"));
}

#[test]
fn required_pins_are_listed() {
    let template = dht_template();
    let required: Vec<&str> = template.required_pins().map(|p| p.role.as_str()).collect();
    assert_eq!(required, vec!["dht_pin"]);
    assert_eq!(template.pin("dht_pin").map(|p| p.kind), Some(PinKind::Digital));
}

#[test]
fn status_transitions_are_monotonic_within_attempt() {
    assert!(ProvisioningStatus::Pending.can_transition_to(ProvisioningStatus::Compiling));
    assert!(ProvisioningStatus::Compiling.can_transition_to(ProvisioningStatus::Success));
    assert!(!ProvisioningStatus::Success.can_transition_to(ProvisioningStatus::Pending));
    assert!(!ProvisioningStatus::Pending.can_transition_to(ProvisioningStatus::Success));
    assert!(ProvisioningStatus::Error.can_transition_to(ProvisioningStatus::Compiling));
    assert_eq!(
        ProvisioningStatus::parse(ProvisioningStatus::Error.as_str()),
        Some(ProvisioningStatus::Error)
    );
}
