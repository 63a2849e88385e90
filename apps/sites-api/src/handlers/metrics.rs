//! 计数器快照。
//!
//! - GET /api/metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sites_telemetry::metrics;

pub async fn get_metrics() -> Response {
    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            provision_requests: snapshot.provision_requests,
            compile_started: snapshot.compile_started,
            compile_success: snapshot.compile_success,
            compile_failure: snapshot.compile_failure,
            compile_timeout: snapshot.compile_timeout,
            upload_started: snapshot.upload_started,
            upload_success: snapshot.upload_success,
            upload_failure: snapshot.upload_failure,
            upload_timeout: snapshot.upload_timeout,
            build_duration_ms_total: snapshot.build_duration_ms_total,
            build_duration_ms_count: snapshot.build_duration_ms_count,
            devices_materialized: snapshot.devices_materialized,
            discovery_probes: snapshot.discovery_probes,
            discovery_matches: snapshot.discovery_matches,
            telemetry_messages: snapshot.telemetry_messages,
            telemetry_dropped: snapshot.telemetry_dropped,
            telemetry_lookup_miss: snapshot.telemetry_lookup_miss,
            telemetry_history_appended: snapshot.telemetry_history_appended,
        })),
    )
        .into_response()
}
