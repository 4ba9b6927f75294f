//! Health check handlers

use crate::{AppState, StoreHandle};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub content_store: CheckResult,
    pub generator: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn up(latency_ms: Option<u64>) -> Self {
        Self {
            status: "up".to_string(),
            latency_ms,
            error: None,
        }
    }

    fn down(error: impl ToString) -> Self {
        Self {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(error.to_string()),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: saathi_common::VERSION,
    })
}

/// Readiness probe - checks the content store and provider credentials
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = std::time::Instant::now();

    let content_store = match &state.store {
        StoreHandle::Postgres(db) => match db.ping().await {
            Ok(_) => CheckResult::up(Some(start.elapsed().as_millis() as u64)),
            Err(e) => CheckResult::down(e),
        },
        StoreHandle::Memory => CheckResult::up(None),
    };

    let generator = match state.search.check_credentials() {
        Ok(_) => CheckResult::up(None),
        Err(e) => CheckResult::down(e),
    };

    let all_healthy = content_store.is_up() && generator.is_up();
    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks {
                content_store,
                generator,
            },
        }),
    )
}
