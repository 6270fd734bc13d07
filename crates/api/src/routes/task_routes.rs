//! Task route endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{AggregateId, OrderId};
use route_store::RouteStore;
use routing::{
    Aggregate, AssignWorker, CommandResult, CompleteStage, CreateRoute, DomainEvent, FailStage,
    ResolveRequest, StageStatus, StartStage, TaskRoute,
};
use serde::{Deserialize, Serialize};

use super::SharedState;
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub worker_id: String,
    pub task_id: String,
}

#[derive(Debug, Deserialize)]
pub struct FailRequest {
    pub reason: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub route_id: String,
    pub order_id: String,
    pub wave_id: String,
    pub template_id: String,
    pub path_type: String,
    pub status: String,
    pub current_stage_index: usize,
    pub progress: ProgressResponse,
    pub stages: Vec<StageStatus>,
    pub special_handling: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_path_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl From<&TaskRoute> for RouteResponse {
    fn from(route: &TaskRoute) -> Self {
        let (completed, total) = route.progress();
        Self {
            route_id: route.route_id().to_string(),
            order_id: route.order_id().to_string(),
            wave_id: route.wave_id().to_string(),
            template_id: route.template_id().to_string(),
            path_type: route.path_type().to_string(),
            status: route.status().to_string(),
            current_stage_index: route.current_stage_index(),
            progress: ProgressResponse { completed, total },
            stages: route.stages().to_vec(),
            special_handling: route.special_handling().to_vec(),
            process_path_id: route.process_path_id().map(str::to_string),
            created_at: route.created_at(),
            updated_at: route.updated_at(),
            completed_at: route.completed_at(),
            version: route.version().as_i64(),
        }
    }
}

/// A route after a write, with the event types the write emitted.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub route: RouteResponse,
    pub events: Vec<&'static str>,
}

impl From<CommandResult<TaskRoute>> for TransitionResponse {
    fn from(result: CommandResult<TaskRoute>) -> Self {
        Self {
            route: RouteResponse::from(&result.aggregate),
            events: result.events.iter().map(|e| e.event_type()).collect(),
        }
    }
}

// -- Handlers --

/// POST /routes: resolve a template for an order and create its route.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn create<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Json(req): Json<ResolveRequest>,
) -> Result<(StatusCode, Json<TransitionResponse>), ApiError> {
    let result = state.route_service.create_route(CreateRoute::from(req)).await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// GET /routes/{id}: load a route by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> Result<Json<RouteResponse>, ApiError> {
    let route_id = parse_route_id(&id)?;
    let route = state
        .route_service
        .get_route(route_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Route {id} not found")))?;

    Ok(Json(RouteResponse::from(&route)))
}

/// GET /orders/{order_id}/routes: every route attempt for an order, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_for_order<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(order_id): Path<String>,
) -> Result<Json<Vec<RouteResponse>>, ApiError> {
    let routes = state
        .route_service
        .get_routes_for_order(&OrderId::new(order_id.as_str()))
        .await?;

    if routes.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No routes found for order {order_id}"
        )));
    }

    Ok(Json(routes.iter().map(RouteResponse::from).collect()))
}

/// POST /routes/{id}/assign: bind a worker task to the current stage.
#[tracing::instrument(skip(state))]
pub async fn assign<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let route_id = parse_route_id(&id)?;
    let result = state
        .route_service
        .assign_worker(AssignWorker::new(route_id, req.worker_id, req.task_id))
        .await?;
    Ok(Json(result.into()))
}

/// POST /routes/{id}/start: start the current stage.
#[tracing::instrument(skip(state))]
pub async fn start<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let route_id = parse_route_id(&id)?;
    let result = state
        .route_service
        .start_stage(StartStage::new(route_id))
        .await?;
    Ok(Json(result.into()))
}

/// POST /routes/{id}/complete: complete the current stage.
#[tracing::instrument(skip(state))]
pub async fn complete<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let route_id = parse_route_id(&id)?;
    let result = state
        .route_service
        .complete_stage(CompleteStage::new(route_id))
        .await?;
    Ok(Json(result.into()))
}

/// POST /routes/{id}/fail: fail the current stage and the route with it.
#[tracing::instrument(skip(state))]
pub async fn fail<S: RouteStore + 'static>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
    Json(req): Json<FailRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let route_id = parse_route_id(&id)?;
    let result = state
        .route_service
        .fail_stage(FailStage::new(route_id, req.reason))
        .await?;
    Ok(Json(result.into()))
}

// -- Helpers --

fn parse_route_id(id: &str) -> Result<AggregateId, ApiError> {
    AggregateId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid route ID: {e}")))
}
