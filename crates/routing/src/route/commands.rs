//! Task route commands.

use common::{AggregateId, OrderId, TaskId, WaveId, WorkerId};

use crate::command::Command;
use crate::template::{ProcessPathType, ResolveRequest};

use super::{RouteError, TaskRoute};

/// Command to resolve and persist a new route for an order.
#[derive(Debug, Clone)]
pub struct CreateRoute {
    /// What the resolver needs to select a template.
    pub request: ResolveRequest,
}

impl CreateRoute {
    /// Creates a new CreateRoute command.
    pub fn new(
        order_id: impl Into<OrderId>,
        wave_id: impl Into<WaveId>,
        path_type: impl Into<ProcessPathType>,
        item_count: u32,
    ) -> Self {
        Self {
            request: ResolveRequest::new(order_id, wave_id, path_type, item_count),
        }
    }

    /// Sets the special-handling tags.
    pub fn with_special_handling(
        mut self,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.request = self.request.with_special_handling(tags);
        self
    }

    /// Sets the process-path decision ID.
    pub fn with_process_path_id(mut self, process_path_id: impl Into<String>) -> Self {
        self.request = self.request.with_process_path_id(process_path_id);
        self
    }
}

impl From<ResolveRequest> for CreateRoute {
    fn from(request: ResolveRequest) -> Self {
        Self { request }
    }
}

/// Command to bind a worker task to the current stage.
#[derive(Debug, Clone)]
pub struct AssignWorker {
    /// The route to assign.
    pub route_id: AggregateId,

    /// The worker who will execute the stage.
    pub worker_id: WorkerId,

    /// The task created by the stage's service.
    pub task_id: TaskId,
}

impl AssignWorker {
    /// Creates a new AssignWorker command.
    pub fn new(
        route_id: AggregateId,
        worker_id: impl Into<WorkerId>,
        task_id: impl Into<TaskId>,
    ) -> Self {
        Self {
            route_id,
            worker_id: worker_id.into(),
            task_id: task_id.into(),
        }
    }
}

impl Command for AssignWorker {
    type Aggregate = TaskRoute;

    fn aggregate_id(&self) -> AggregateId {
        self.route_id
    }

    fn apply(self, route: &mut TaskRoute) -> Result<(), RouteError> {
        route.assign_worker_to_current_stage(self.worker_id, self.task_id)
    }
}

/// Command to start the current stage.
#[derive(Debug, Clone)]
pub struct StartStage {
    /// The route whose current stage starts.
    pub route_id: AggregateId,
}

impl StartStage {
    /// Creates a new StartStage command.
    pub fn new(route_id: AggregateId) -> Self {
        Self { route_id }
    }
}

impl Command for StartStage {
    type Aggregate = TaskRoute;

    fn aggregate_id(&self) -> AggregateId {
        self.route_id
    }

    fn apply(self, route: &mut TaskRoute) -> Result<(), RouteError> {
        route.start_current_stage()
    }
}

/// Command to complete the current stage.
#[derive(Debug, Clone)]
pub struct CompleteStage {
    /// The route whose current stage completes.
    pub route_id: AggregateId,
}

impl CompleteStage {
    /// Creates a new CompleteStage command.
    pub fn new(route_id: AggregateId) -> Self {
        Self { route_id }
    }
}

impl Command for CompleteStage {
    type Aggregate = TaskRoute;

    fn aggregate_id(&self) -> AggregateId {
        self.route_id
    }

    fn apply(self, route: &mut TaskRoute) -> Result<(), RouteError> {
        route.complete_current_stage()
    }
}

/// Command to fail the current stage, ending the route.
#[derive(Debug, Clone)]
pub struct FailStage {
    /// The route whose current stage fails.
    pub route_id: AggregateId,

    /// Reason for the failure.
    pub reason: String,
}

impl FailStage {
    /// Creates a new FailStage command.
    pub fn new(route_id: AggregateId, reason: impl Into<String>) -> Self {
        Self {
            route_id,
            reason: reason.into(),
        }
    }
}

impl Command for FailStage {
    type Aggregate = TaskRoute;

    fn aggregate_id(&self) -> AggregateId {
        self.route_id
    }

    fn apply(self, route: &mut TaskRoute) -> Result<(), RouteError> {
        route.fail_current_stage(self.reason)
    }
}
