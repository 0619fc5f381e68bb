use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use super::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    model: ComponentHealth,
}

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(generation: String) -> Self {
        Self {
            status: "healthy".to_string(),
            generation: Some(generation),
            error: None,
        }
    }

    fn missing() -> Self {
        Self {
            status: "no_model".to_string(),
            generation: None,
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            generation: None,
            error: Some(error),
        }
    }
}

/// GET /healthz - Liveness probe with the model slot status
///
/// Always 200 while the process serves requests; a missing model is reported
/// in the body, not as a failure.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.pipeline.store().clone();
    let model = match tokio::task::spawn_blocking(move || store.current_generation()).await {
        Ok(Ok(Some(generation))) => ComponentHealth::healthy(generation),
        Ok(Ok(None)) => ComponentHealth::missing(),
        Ok(Err(e)) => ComponentHealth::unhealthy(e.to_string()),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now(),
        checks: HealthChecks { model },
    })
}
