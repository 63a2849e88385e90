use sites_telemetry::{metrics, new_request_ids, record_compile_timeout, record_discovery_probes};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn compile_timeout_counts_as_failure() {
    let before = metrics().snapshot();
    record_compile_timeout();
    record_discovery_probes(254);
    let after = metrics().snapshot();
    assert!(after.compile_timeout > before.compile_timeout);
    assert!(after.compile_failure > before.compile_failure);
    assert!(after.discovery_probes >= before.discovery_probes + 254);
}
