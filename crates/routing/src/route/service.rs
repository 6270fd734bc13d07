//! Route service providing the API the orchestration layer calls.

use std::sync::Arc;

use common::{AggregateId, OrderId};
use route_store::RouteStore;

use crate::command::{Command, CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::template::{ExecutionPlan, PlanRequest, RouteResolver, TemplateRegistry};

use super::{AssignWorker, CompleteStage, CreateRoute, FailStage, StartStage, TaskRoute};

/// Service for resolving and driving task routes.
///
/// Wraps the resolver and the command handler. Each transition loads the
/// route, applies one operation and saves the new state together with the
/// events it produced. A concurrency conflict is returned to the caller
/// unchanged; the service never retries.
pub struct RouteService<S: RouteStore> {
    handler: CommandHandler<S, TaskRoute>,
    resolver: RouteResolver,
}

impl<S: RouteStore> RouteService<S> {
    /// Creates a new route service.
    pub fn new(store: S, registry: Arc<TemplateRegistry>) -> Self {
        Self {
            handler: CommandHandler::new(store),
            resolver: RouteResolver::new(registry),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, TaskRoute> {
        &self.handler
    }

    /// Returns the template registry.
    pub fn registry(&self) -> &TemplateRegistry {
        self.resolver.registry()
    }

    /// Returns the template an order would be routed through.
    #[tracing::instrument(
        skip(self, request),
        fields(path_type = %request.path_type, item_count = request.item_count)
    )]
    pub fn resolve_execution_plan(
        &self,
        request: &PlanRequest,
    ) -> Result<ExecutionPlan, DomainError> {
        match self.resolver.plan(request) {
            Ok(plan) => {
                tracing::info!(template_id = %plan.template_id, "Resolved execution plan");
                Ok(plan)
            }
            Err(e) => {
                tracing::warn!(error = %e, "No execution plan");
                Err(e.into())
            }
        }
    }

    /// Resolves a route for an order and persists it with its `RouteCreated` event.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.request.order_id))]
    pub async fn create_route(
        &self,
        cmd: CreateRoute,
    ) -> Result<CommandResult<TaskRoute>, DomainError> {
        let route = match self.resolver.resolve(&cmd.request) {
            Ok(route) => route,
            Err(e) => {
                tracing::warn!(
                    path_type = %cmd.request.path_type,
                    item_count = cmd.request.item_count,
                    error = %e,
                    "Route resolution failed"
                );
                return Err(e);
            }
        };

        let result = self.handler.create(route).await?;
        tracing::info!(
            route_id = %result.aggregate.route_id(),
            template_id = %result.aggregate.template_id(),
            stages = result.aggregate.stages().len(),
            "Route created"
        );
        Ok(result)
    }

    /// Binds a worker task to the route's current stage.
    #[tracing::instrument(skip(self))]
    pub async fn assign_worker(
        &self,
        cmd: AssignWorker,
    ) -> Result<CommandResult<TaskRoute>, DomainError> {
        self.transition("assign", cmd).await
    }

    /// Starts the route's current stage.
    #[tracing::instrument(skip(self))]
    pub async fn start_stage(
        &self,
        cmd: StartStage,
    ) -> Result<CommandResult<TaskRoute>, DomainError> {
        self.transition("start", cmd).await
    }

    /// Completes the route's current stage.
    #[tracing::instrument(skip(self))]
    pub async fn complete_stage(
        &self,
        cmd: CompleteStage,
    ) -> Result<CommandResult<TaskRoute>, DomainError> {
        self.transition("complete", cmd).await
    }

    /// Fails the route's current stage.
    #[tracing::instrument(skip(self))]
    pub async fn fail_stage(&self, cmd: FailStage) -> Result<CommandResult<TaskRoute>, DomainError> {
        self.transition("fail", cmd).await
    }

    /// Loads a route by ID.
    ///
    /// Returns None if the route doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_route(&self, route_id: AggregateId) -> Result<Option<TaskRoute>, DomainError> {
        self.handler.load(route_id).await
    }

    /// Loads every route created for an order, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_routes_for_order(
        &self,
        order_id: &OrderId,
    ) -> Result<Vec<TaskRoute>, DomainError> {
        self.handler.load_for_order(order_id.as_str()).await
    }

    /// Checks that the route store can serve requests.
    pub async fn check_ready(&self) -> Result<(), DomainError> {
        self.handler.store().ping().await?;
        Ok(())
    }

    async fn transition<C>(
        &self,
        action: &'static str,
        cmd: C,
    ) -> Result<CommandResult<TaskRoute>, DomainError>
    where
        C: Command<Aggregate = TaskRoute>,
    {
        let route_id = cmd.aggregate_id();

        match self.handler.execute(cmd).await {
            Ok(result) => {
                tracing::info!(
                    %route_id,
                    action,
                    status = %result.aggregate.status(),
                    version = %result.new_version,
                    "Route transition applied"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(%route_id, action, error = %e, "Route transition rejected");
                Err(e)
            }
        }
    }
}
