//! HTTP adapter for the warehouse execution routing engine.
//!
//! Exposes template resolution and the task route transitions as REST
//! endpoints, with structured logging (tracing) on every request.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use route_store::RouteStore;
use routing::{RouteService, TemplateRegistry};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::{AppState, SharedState};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RouteStore + 'static>(state: SharedState<S>) -> Router {
    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/ready", get(routes::health::ready::<S>))
        .route("/templates", get(routes::templates::list::<S>))
        .route("/templates/{id}", get(routes::templates::get::<S>))
        .route("/execution-plans", post(routes::templates::plan::<S>))
        .route("/routes", post(routes::task_routes::create::<S>))
        .route("/routes/{id}", get(routes::task_routes::get::<S>))
        .route("/routes/{id}/assign", post(routes::task_routes::assign::<S>))
        .route("/routes/{id}/start", post(routes::task_routes::start::<S>))
        .route(
            "/routes/{id}/complete",
            post(routes::task_routes::complete::<S>),
        )
        .route("/routes/{id}/fail", post(routes::task_routes::fail::<S>))
        .route(
            "/orders/{order_id}/routes",
            get(routes::task_routes::list_for_order::<S>),
        )
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over a store and a template catalog.
pub fn create_state<S: RouteStore + 'static>(
    store: S,
    registry: Arc<TemplateRegistry>,
) -> SharedState<S> {
    Arc::new(AppState {
        route_service: RouteService::new(store, registry),
    })
}

/// Creates application state over the built-in catalog.
pub fn create_default_state<S: RouteStore + 'static>(store: S) -> SharedState<S> {
    create_state(store, Arc::new(TemplateRegistry::with_defaults()))
}
