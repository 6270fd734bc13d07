//! Warehouse execution routing.
//!
//! This crate decides which ordered sequence of fulfillment stages an order
//! passes through and drives the order through them:
//! - Stage templates and the registry that selects one per order
//! - The task route aggregate, a single-active-stage state machine
//! - Route domain events, drained into the store's outbox on every save
//! - A command handler and service that wrap load, transition and save

pub mod aggregate;
pub mod command;
pub mod error;
pub mod route;
pub mod template;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use route::{
    AssignWorker, CompleteStage, CreateRoute, FailStage, RouteError, RouteEvent, RouteService,
    RouteStatus, StageState, StageStatus, StartStage, TaskRoute,
};
pub use template::{
    ExecutionPlan, PlanRequest, ProcessPathType, ResolveRequest, RouteResolver, SelectionCriteria,
    StageConfig, StageDefinition, StageKind, StageTemplate, TemplateError, TemplateRegistry,
    default_templates, load_catalog, parse_catalog,
};
