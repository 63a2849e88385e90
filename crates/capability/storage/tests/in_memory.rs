use domain::{BuildResult, ProvisioningStatus, UploadStatus};
use sites_storage::{
    CompileUpdate, ConfigReset, DEVICE_OFFLINE, DEVICE_ONLINE, DeviceRecord, DeviceStore,
    EntityRecord, EntityStore, HistoryRecord, HistoryStore, InMemoryDeviceStore,
    InMemoryEntityStore, InMemoryHistoryStore, InMemoryProvisioningStore, ProvisioningRecord,
    ProvisioningStore, UploadUpdate,
};

fn record(record_id: &str, slug: &str, created_at_ms: i64) -> ProvisioningRecord {
    ProvisioningRecord {
        record_id: record_id.to_string(),
        name: slug.to_string(),
        slug: slug.to_string(),
        template_id: "motion_sensor".to_string(),
        site_location_id: None,
        ip_address: None,
        config_yaml: "esphome: {}\n".to_string(),
        compile_status: ProvisioningStatus::Pending,
        upload_status: UploadStatus::Idle,
        firmware_version: None,
        last_build: None,
        created_at_ms,
        updated_at_ms: created_at_ms,
    }
}

fn device(device_id: &str, name: &str, slug: &str) -> DeviceRecord {
    DeviceRecord {
        device_id: device_id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        device_type: "motion_sensor".to_string(),
        site_location_id: Some(1),
        ip_address: None,
        status: DEVICE_OFFLINE.to_string(),
        last_seen_at_ms: None,
        created_at_ms: 1,
    }
}

#[tokio::test]
async fn provisioning_records_track_statuses() {
    let store = InMemoryProvisioningStore::new();
    store.create_record(record("rec-2", "b", 20)).await.expect("create");
    store.create_record(record("rec-1", "a", 10)).await.expect("create");
    assert!(store.create_record(record("rec-3", "a", 30)).await.is_err());

    let listed = store.list_records().await.expect("list");
    let slugs: Vec<&str> = listed.iter().map(|r| r.slug.as_str()).collect();
    assert_eq!(slugs, vec!["a", "b"]);

    let build = BuildResult {
        success: true,
        stdout: "ok".to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        timed_out: false,
    };
    let updated = store
        .update_compile(
            "rec-1",
            CompileUpdate {
                status: ProvisioningStatus::Success,
                firmware_version: Some("compiled_1".to_string()),
                last_build: Some(build.clone()),
                updated_at_ms: 40,
            },
        )
        .await
        .expect("update")
        .expect("record");
    assert_eq!(updated.compile_status, ProvisioningStatus::Success);
    assert_eq!(updated.last_build, Some(build));

    // 不带 last_build 的更新保留上次构建结果
    let uploading = store
        .update_upload(
            "rec-1",
            UploadUpdate {
                status: UploadStatus::Uploading,
                last_build: None,
                updated_at_ms: 50,
            },
        )
        .await
        .expect("update")
        .expect("record");
    assert!(uploading.last_build.is_some());
    assert_eq!(uploading.firmware_version.as_deref(), Some("compiled_1"));

    let reset = store
        .reset_config(
            "rec-1",
            ConfigReset {
                name: "A".to_string(),
                template_id: "light_sensor".to_string(),
                site_location_id: Some(2),
                config_yaml: "esphome: {name: a}\n".to_string(),
                updated_at_ms: 60,
            },
        )
        .await
        .expect("reset")
        .expect("record");
    assert_eq!(reset.compile_status, ProvisioningStatus::Pending);
    assert_eq!(reset.upload_status, UploadStatus::Idle);
    // 重新生成配置后，上一轮的固件与构建输出不再有效
    assert!(reset.firmware_version.is_none());
    assert!(reset.last_build.is_none());
    assert_eq!(reset.template_id, "light_sensor");

    let missing = store
        .set_ip_address("rec-404", "10.0.0.2", 70)
        .await
        .expect("set");
    assert!(missing.is_none());
}

#[tokio::test]
async fn device_lookup_prefers_name_then_slug() {
    let store = InMemoryDeviceStore::new();
    store
        .create_device(device("dev-1", "Gate Motion", "gate_motion"))
        .await
        .expect("create");
    store
        .create_device(device("dev-2", "gate_motion", "gate_motion_2"))
        .await
        .expect("create");
    assert!(
        store
            .create_device(device("dev-3", "Gate Motion", "x"))
            .await
            .is_err()
    );

    let by_name = store.find_device_by_key("gate_motion").await.expect("find");
    assert_eq!(by_name.map(|d| d.device_id), Some("dev-2".to_string()));
    let by_slug = store.find_device_by_key("gate_motion_2").await.expect("find");
    assert_eq!(by_slug.map(|d| d.device_id), Some("dev-2".to_string()));
    assert!(store.find_device_by_key("nope").await.expect("find").is_none());

    assert!(store.set_status("dev-1", DEVICE_ONLINE, 99).await.expect("status"));
    let online = store.find_device("dev-1").await.expect("find").expect("device");
    assert_eq!(online.status, DEVICE_ONLINE);
    assert_eq!(online.last_seen_at_ms, Some(99));
}

#[tokio::test]
async fn entity_values_and_history() {
    let entities = InMemoryEntityStore::new();
    let history = InMemoryHistoryStore::new();
    entities
        .create_entity(EntityRecord {
            entity_id: "ent-1".to_string(),
            device_id: "dev-1".to_string(),
            name: "temperature".to_string(),
            entity_type: "sensor".to_string(),
            unit: Some("°C".to_string()),
            current_value: "unknown".to_string(),
            updated_at_ms: 1,
        })
        .await
        .expect("create");

    assert!(entities.update_value("ent-1", "21.5", 2).await.expect("update"));
    assert!(!entities.update_value("ent-404", "1", 2).await.expect("update"));
    let entity = entities
        .find_entity("dev-1", "temperature")
        .await
        .expect("find")
        .expect("entity");
    assert_eq!(entity.current_value, "21.5");

    for (idx, (old, new)) in [("unknown", "21.5"), ("21.5", "22.0")].iter().enumerate() {
        history
            .append_history(HistoryRecord {
                history_id: format!("h-{idx}"),
                entity_id: "ent-1".to_string(),
                old_value: old.to_string(),
                new_value: new.to_string(),
                ts_ms: idx as i64,
            })
            .await
            .expect("append");
    }
    let items = history.list_history("ent-1").await.expect("list");
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].new_value, "22.0");
}
