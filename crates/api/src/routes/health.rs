//! Health and readiness endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use route_store::RouteStore;
use serde::Serialize;

use super::SharedState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub template_count: usize,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
}

/// GET /health: returns service health and the size of the loaded catalog.
pub async fn check<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        template_count: state.route_service.registry().len(),
    })
}

/// GET /ready: 200 when the route store answers, 503 otherwise.
pub async fn ready<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
) -> (StatusCode, Json<ReadyResponse>) {
    match state.route_service.check_ready().await {
        Ok(()) => (StatusCode::OK, Json(ReadyResponse { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}
