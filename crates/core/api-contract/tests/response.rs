use api_contract::{ApiResponse, DiscoveredHostDto, TaskAcceptedDto};
use serde_json::json;

#[test]
fn accepted_task_envelope() {
    let response = ApiResponse::success(TaskAcceptedDto {
        id: "rec-1".to_string(),
        message: "compilation started".to_string(),
    });
    let value = serde_json::to_value(&response).expect("serialize");
    assert_eq!(
        value,
        json!({
            "success": true,
            "data": {"id": "rec-1", "message": "compilation started"},
            "error": null
        })
    );
}

#[test]
fn busy_error_envelope_has_no_data() {
    let response = ApiResponse::<()>::error("RESOURCE.BUSY", "gate_motion build in progress");
    let value = serde_json::to_value(&response).expect("serialize");
    assert_eq!(value["success"], json!(false));
    assert!(value["data"].is_null());
    assert_eq!(value["error"]["code"], json!("RESOURCE.BUSY"));
}

#[test]
fn discovered_host_keeps_missing_hostname_as_null() {
    let dto = DiscoveredHostDto {
        ip: "192.168.1.40".to_string(),
        hostname: None,
        device_info: "Unknown".to_string(),
    };
    let value = serde_json::to_value(&dto).expect("serialize");
    assert_eq!(value["deviceInfo"], json!("Unknown"));
    assert!(value["hostname"].is_null());
}
