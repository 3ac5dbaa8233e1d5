//! Health check handlers

use crate::handlers::ApiResponse;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use workforce_common::config::StorageBackend;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub storage: StorageBackend,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        version: workforce_common::VERSION.to_string(),
    })
}

/// Readiness probe - checks the backing store
pub async fn status(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<StatusResponse>>) {
    let start = std::time::Instant::now();

    let db_check = match state.directory.ping().await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(e.public_message()),
        },
    };

    let all_healthy = db_check.status == "up";
    let code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        ApiResponse::ok(StatusResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            version: workforce_common::VERSION.to_string(),
            service: state.config.observability.service_name.clone(),
            storage: state.config.storage.backend,
            checks: HealthChecks { database: db_check },
        }),
    )
}
