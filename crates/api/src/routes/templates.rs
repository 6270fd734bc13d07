//! Template catalog and execution plan endpoints.

use axum::Json;
use axum::extract::{Path, State};
use route_store::RouteStore;
use routing::{ExecutionPlan, PlanRequest, StageTemplate};

use super::SharedState;
use crate::error::ApiError;

/// GET /templates: list the catalog in registration order.
pub async fn list<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
) -> Json<Vec<StageTemplate>> {
    Json(state.route_service.registry().templates().to_vec())
}

/// GET /templates/{id}: a single template by ID.
pub async fn get<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> Result<Json<StageTemplate>, ApiError> {
    state
        .route_service
        .registry()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Template {id} not found")))
}

/// POST /execution-plans: select a template without creating a route.
#[tracing::instrument(skip(state))]
pub async fn plan<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<ExecutionPlan>, ApiError> {
    let plan = state.route_service.resolve_execution_plan(&req)?;
    Ok(Json(plan))
}
