use domain::{ConfigValue, ProvisioningRequest};
use sites_generator::{ConfigFileStore, ConfigGenerator, GenerateError, GeneratorSettings, render_yaml};
use sites_secrets::SecretRefs;
use sites_templates::TemplateRegistry;
use std::collections::BTreeMap;

fn request(name: &str, template_id: &str, pins: &[(&str, &str)]) -> ProvisioningRequest {
    ProvisioningRequest {
        name: name.to_string(),
        template_id: template_id.to_string(),
        pins: pins
            .iter()
            .map(|(role, pin)| (role.to_string(), pin.to_string()))
            .collect::<BTreeMap<_, _>>(),
        site_location_id: None,
    }
}

fn generator() -> ConfigGenerator {
    ConfigGenerator::new(GeneratorSettings::default())
}

#[test]
fn every_builtin_template_resolves_with_complete_bindings() {
    let registry = TemplateRegistry::builtin();
    let refs = SecretRefs::default();
    for template in registry.list() {
        let pins: Vec<(&str, &str)> = template
            .pins
            .iter()
            .map(|pin| (pin.role.as_str(), "GPIO13"))
            .collect();
        let config = generator()
            .generate(&request("Site Device", &template.id, &pins), template, &refs)
            .expect("generate");
        assert!(config.unresolved_placeholders().is_empty(), "{}", template.id);
        assert!(config.document.contains_key("esphome"));
        for family in &template.sensors {
            assert!(config.document.contains_key(family), "{}", template.id);
        }
    }
}

#[test]
fn missing_required_pin_is_rejected() {
    let registry = TemplateRegistry::builtin();
    let err = generator()
        .generate_from_registry(&registry, &request("Gate", "motion_sensor", &[]), &SecretRefs::default())
        .expect_err("missing pin");
    assert!(matches!(
        err,
        GenerateError::MissingRequiredPin { ref role, .. } if role == "motion_pin"
    ));

    let blank = generator()
        .generate_from_registry(
            &registry,
            &request("Gate", "motion_sensor", &[("motion_pin", "  ")]),
            &SecretRefs::default(),
        )
        .expect_err("blank pin");
    assert!(matches!(blank, GenerateError::MissingRequiredPin { .. }));
}

#[test]
fn unknown_template_and_empty_slug_are_rejected() {
    let registry = TemplateRegistry::builtin();
    let refs = SecretRefs::default();
    let unknown = generator()
        .generate_from_registry(&registry, &request("Gate", "smoke", &[]), &refs)
        .expect_err("unknown");
    assert!(matches!(unknown, GenerateError::UnknownTemplate(ref id) if id == "smoke"));

    let invalid = generator()
        .generate_from_registry(
            &registry,
            &request("!!!", "motion_sensor", &[("motion_pin", "GPIO2")]),
            &refs,
        )
        .expect_err("invalid name");
    assert!(matches!(invalid, GenerateError::InvalidName(_)));
}

#[test]
fn pin_role_outside_template_is_rejected() {
    let registry = TemplateRegistry::builtin();
    let err = generator()
        .generate_from_registry(
            &registry,
            &request("Gate", "motion_sensor", &[("motion_pin", "GPIO2"), ("relay_pin", "GPIO4")]),
            &SecretRefs::default(),
        )
        .expect_err("unknown role");
    assert!(matches!(
        err,
        GenerateError::UnknownPinRole { ref template, ref role }
            if template == "motion_sensor" && role == "relay_pin"
    ));
}

#[test]
fn base_document_uses_slug_and_secret_refs() {
    let registry = TemplateRegistry::builtin();
    let config = generator()
        .generate_from_registry(
            &registry,
            &request("Front Door Sensor!", "door_window_sensor", &[("reed_pin", "GPIO5")]),
            &SecretRefs::default(),
        )
        .expect("generate");
    assert_eq!(config.slug, "front_door_sensor");
    let doc = ConfigValue::Map(config.document.clone());
    assert_eq!(
        doc.get("esphome").and_then(|e| e.get("name")).and_then(ConfigValue::as_str),
        Some("front_door_sensor")
    );
    assert_eq!(
        doc.get("mqtt").and_then(|m| m.get("topic_prefix")).and_then(ConfigValue::as_str),
        Some("smartsites/front_door_sensor")
    );
    assert_eq!(
        doc.get("wifi").and_then(|w| w.get("ap")).and_then(|ap| ap.get("ssid")).and_then(ConfigValue::as_str),
        Some("Front Door Sensor! Fallback")
    );
    assert_eq!(
        doc.get("ota").and_then(|o| o.get("password")),
        Some(&ConfigValue::secret("ota_password"))
    );

    let yaml = render_yaml(&config.document).expect("render");
    assert!(yaml.contains("number: GPIO5"), "{yaml}");
    assert!(yaml.contains("key: !secret api_encryption_key"), "{yaml}");
}

#[test]
fn optional_pin_falls_back_to_default() {
    let registry = TemplateRegistry::builtin();
    let config = generator()
        .generate_from_registry(
            &registry,
            &request("Air 1", "air_quality", &[("dht_pin", "GPIO15")]),
            &SecretRefs::default(),
        )
        .expect("generate");
    assert!(config.unresolved_placeholders().is_empty());
    let yaml = render_yaml(&config.document).expect("render");
    assert!(yaml.contains("pin: GPIO15"), "{yaml}");
}

#[test]
fn config_file_store_saves_atomically_by_slug() {
    let dir = std::env::temp_dir().join(format!("sites-generator-{}", uuid::Uuid::new_v4()));
    let store = ConfigFileStore::new(&dir);
    assert!(!store.exists("gate"));
    assert!(store.load("gate").expect("load").is_none());

    let path = store.save("gate", "esphome:\n  name: gate\n").expect("save");
    assert_eq!(path, dir.join("gate.yaml"));
    assert!(store.exists("gate"));
    store.save("gate", "esphome:\n  name: gate2\n").expect("overwrite");
    assert_eq!(
        store.load("gate").expect("load").as_deref(),
        Some("esphome:\n  name: gate2\n")
    );
    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    let _ = std::fs::remove_dir_all(dir);
}
