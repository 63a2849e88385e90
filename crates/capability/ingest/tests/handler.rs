use sites_ingest::{
    IngestError, IngestOutcome, StoreTelemetryHandler, TelemetryHandler, TelemetryMessage,
};
use sites_storage::{
    DEVICE_OFFLINE, DEVICE_ONLINE, DeviceRecord, DeviceStore, EntityRecord, EntityStore,
    HistoryStore, InMemoryDeviceStore, InMemoryEntityStore, InMemoryHistoryStore,
};
use std::sync::Arc;

struct Fixture {
    devices: Arc<InMemoryDeviceStore>,
    entities: Arc<InMemoryEntityStore>,
    history: Arc<InMemoryHistoryStore>,
    handler: StoreTelemetryHandler,
}

async fn fixture() -> Fixture {
    let devices = Arc::new(InMemoryDeviceStore::new());
    let entities = Arc::new(InMemoryEntityStore::new());
    let history = Arc::new(InMemoryHistoryStore::new());
    devices
        .create_device(DeviceRecord {
            device_id: "dev-1".to_string(),
            name: "Gate A Noise".to_string(),
            slug: "gate_a_noise".to_string(),
            device_type: "noise_monitor".to_string(),
            site_location_id: Some(1),
            ip_address: None,
            status: DEVICE_OFFLINE.to_string(),
            last_seen_at_ms: None,
            created_at_ms: 1,
        })
        .await
        .expect("device");
    entities
        .create_entity(EntityRecord {
            entity_id: "ent-1".to_string(),
            device_id: "dev-1".to_string(),
            name: "noise_level".to_string(),
            entity_type: "sensor".to_string(),
            unit: Some("dB".to_string()),
            current_value: "10".to_string(),
            updated_at_ms: 1,
        })
        .await
        .expect("entity");
    let handler = StoreTelemetryHandler::new(
        "smartsites",
        devices.clone(),
        entities.clone(),
        history.clone(),
    );
    Fixture {
        devices,
        entities,
        history,
        handler,
    }
}

fn message(topic: &str, payload: &str, ts_ms: i64) -> TelemetryMessage {
    TelemetryMessage {
        topic: topic.to_string(),
        payload: payload.to_string(),
        received_at_ms: ts_ms,
    }
}

#[tokio::test]
async fn same_value_writes_no_history() {
    let f = fixture().await;
    let outcome = f
        .handler
        .handle(message("smartsites/gate_a_noise/sensor/noise_level/state", "10", 50))
        .await
        .expect("handle");
    assert_eq!(
        outcome,
        IngestOutcome::Unchanged {
            entity_id: "ent-1".to_string()
        }
    );
    assert!(f.history.list_history("ent-1").await.expect("history").is_empty());

    let device = f.devices.find_device("dev-1").await.expect("find").expect("device");
    assert_eq!(device.status, DEVICE_ONLINE);
    assert_eq!(device.last_seen_at_ms, Some(50));
}

#[tokio::test]
async fn changed_value_appends_one_history_record() {
    let f = fixture().await;
    let outcome = f
        .handler
        .handle(message("smartsites/gate_a_noise/sensor/noise_level/state", "12", 60))
        .await
        .expect("handle");
    assert_eq!(
        outcome,
        IngestOutcome::Updated {
            entity_id: "ent-1".to_string(),
            old_value: "10".to_string(),
            new_value: "12".to_string(),
        }
    );
    let history = f.history.list_history("ent-1").await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_value, "10");
    assert_eq!(history[0].new_value, "12");
    assert_eq!(history[0].ts_ms, 60);

    let entity = f
        .entities
        .find_entity("dev-1", "noise_level")
        .await
        .expect("find")
        .expect("entity");
    assert_eq!(entity.current_value, "12");
    assert_eq!(entity.updated_at_ms, 60);
}

#[tokio::test]
async fn compact_topic_by_display_name() {
    let f = fixture().await;
    let outcome = f
        .handler
        .handle(message("smartsites/Gate A Noise/noise_level", " 15 ", 70))
        .await
        .expect("handle");
    assert!(matches!(outcome, IngestOutcome::Updated { new_value, .. } if new_value == "15"));
}

#[tokio::test]
async fn availability_topic_sets_status() {
    let f = fixture().await;
    let outcome = f
        .handler
        .handle(message("smartsites/gate_a_noise/status", "offline", 80))
        .await
        .expect("handle");
    assert_eq!(
        outcome,
        IngestOutcome::Availability {
            device_id: "dev-1".to_string(),
            status: DEVICE_OFFLINE.to_string()
        }
    );
    let device = f.devices.find_device("dev-1").await.expect("find").expect("device");
    assert_eq!(device.status, DEVICE_OFFLINE);
}

#[tokio::test]
async fn misses_and_malformed_topics_are_errors_not_writes() {
    let f = fixture().await;
    let err = f
        .handler
        .handle(message("smartsites/unknown_device/sensor/x/state", "1", 90))
        .await
        .expect_err("device miss");
    assert!(matches!(err, IngestError::DeviceNotFound(_)));
    assert!(err.is_lookup_miss());

    let err = f
        .handler
        .handle(message("smartsites/gate_a_noise/sensor/vibration/state", "1", 90))
        .await
        .expect_err("entity miss");
    assert!(matches!(err, IngestError::EntityNotFound { .. }));
    assert!(err.is_lookup_miss());

    let err = f
        .handler
        .handle(message("elsewhere/gate_a_noise/noise_level", "1", 90))
        .await
        .expect_err("malformed");
    assert!(matches!(err, IngestError::MalformedTopic(_)));
    assert!(!err.is_lookup_miss());

    assert!(f.history.list_history("ent-1").await.expect("history").is_empty());
}
