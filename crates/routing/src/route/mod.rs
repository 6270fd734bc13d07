//! Task route aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::TaskRoute;
pub use commands::*;
pub use events::{
    RouteCompletedData, RouteCreatedData, RouteEvent, StageAssignedData, StageCompletedData,
    StageFailedData, StageStartedData,
};
pub use service::RouteService;
pub use state::{RouteStatus, StageState, StageStatus};

use thiserror::Error;

/// Errors that can occur during route operations.
///
/// All of these describe a transition the route's current state does not
/// allow. They are never retried.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Every stage already completed.
    #[error("Route already completed")]
    RouteAlreadyCompleted,

    /// A stage already failed.
    #[error("Route already failed")]
    RouteAlreadyFailed,

    /// The cursor is past the last stage.
    #[error("Route has no current stage")]
    NoCurrentStage,

    #[error("Stage not pending (current state: {state})")]
    StageNotPending { state: StageState },

    #[error("Stage not assigned (current state: {state})")]
    StageNotAssigned { state: StageState },

    #[error("Stage not in progress (current state: {state})")]
    StageNotInProgress { state: StageState },

    /// Order ID is required.
    #[error("Order ID is required")]
    MissingOrderId,

    /// Worker ID is required.
    #[error("Worker ID is required")]
    MissingWorkerId,

    /// Task ID is required.
    #[error("Task ID is required")]
    MissingTaskId,

    /// The template has no stages to build a route from.
    #[error("Template {template_id} has no stages")]
    EmptyTemplate { template_id: String },
}

impl RouteError {
    /// Returns true if the error rejects a transition on an existing route,
    /// as opposed to malformed input.
    pub fn is_state_conflict(&self) -> bool {
        match self {
            RouteError::RouteAlreadyCompleted
            | RouteError::RouteAlreadyFailed
            | RouteError::NoCurrentStage
            | RouteError::StageNotPending { .. }
            | RouteError::StageNotAssigned { .. }
            | RouteError::StageNotInProgress { .. } => true,
            RouteError::MissingOrderId
            | RouteError::MissingWorkerId
            | RouteError::MissingTaskId
            | RouteError::EmptyTemplate { .. } => false,
        }
    }
}
