//! HTTP handlers.

pub mod health;
pub mod task_routes;
pub mod templates;

use std::sync::Arc;

use route_store::RouteStore;
use routing::RouteService;

/// Shared application state accessible from all handlers.
pub struct AppState<S: RouteStore> {
    pub route_service: RouteService<S>,
}

/// State extractor type used by every handler.
pub type SharedState<S> = Arc<AppState<S>>;
