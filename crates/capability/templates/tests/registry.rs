use domain::PinKind;
use sites_templates::{TemplateError, TemplateRegistry};

#[test]
fn builtin_catalog_keeps_declaration_order() {
    let registry = TemplateRegistry::builtin();
    let ids: Vec<&str> = registry.list().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "motion_sensor",
            "light_sensor",
            "air_quality",
            "noise_monitor",
            "power_monitor",
            "door_window_sensor",
        ]
    );
}

#[test]
fn unknown_template_is_an_error() {
    let registry = TemplateRegistry::builtin();
    let err = registry.get("smoke_detector").expect_err("unknown");
    assert!(matches!(err, TemplateError::UnknownTemplate(id) if id == "smoke_detector"));
}

#[test]
fn every_placeholder_names_a_declared_pin() {
    let registry = TemplateRegistry::builtin();
    for template in registry.list() {
        for value in template.blueprint.values() {
            for role in value.placeholders() {
                assert!(
                    template.pin(&role).is_some(),
                    "{}: placeholder {role} has no pin",
                    template.id
                );
            }
        }
    }
}

#[test]
fn air_quality_declares_dht_entities_and_optional_pin() {
    let registry = TemplateRegistry::builtin();
    let template = registry.get("air_quality").expect("template");
    let names: Vec<String> = template
        .declared_entities()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["Humidity".to_string(), "Temperature".to_string()]);
    let mq135 = template.pin("mq135_pin").expect("pin");
    assert!(!mq135.required);
    assert_eq!(mq135.kind, PinKind::Analog);
}

#[test]
fn door_sensor_pin_is_nested() {
    let registry = TemplateRegistry::builtin();
    let template = registry.get("door_window_sensor").expect("template");
    let placeholders: Vec<String> = template
        .blueprint
        .values()
        .flat_map(|value| value.placeholders())
        .collect();
    assert_eq!(placeholders, vec!["reed_pin".to_string()]);
}
