//! Task route domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, OrderId, TaskId, WaveId, WorkerId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::template::{ProcessPathType, StageKind};

/// Events that can occur on a task route.
///
/// The `wms.wes.*` type strings are consumed by other services and must
/// not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RouteEvent {
    /// Route was built from a template.
    RouteCreated(RouteCreatedData),

    /// A worker task was bound to the current stage.
    StageAssigned(StageAssignedData),

    /// The worker began the current stage.
    StageStarted(StageStartedData),

    /// The current stage finished successfully.
    StageCompleted(StageCompletedData),

    /// The current stage failed, ending the route.
    StageFailed(StageFailedData),

    /// The last stage completed.
    RouteCompleted(RouteCompletedData),
}

impl DomainEvent for RouteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RouteEvent::RouteCreated(_) => "wms.wes.route-created",
            RouteEvent::StageAssigned(_) => "wms.wes.stage-assigned",
            RouteEvent::StageStarted(_) => "wms.wes.stage-started",
            RouteEvent::StageCompleted(_) => "wms.wes.stage-completed",
            RouteEvent::StageFailed(_) => "wms.wes.stage-failed",
            RouteEvent::RouteCompleted(_) => "wms.wes.route-completed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RouteEvent::RouteCreated(data) => data.created_at,
            RouteEvent::StageAssigned(data) => data.assigned_at,
            RouteEvent::StageStarted(data) => data.started_at,
            RouteEvent::StageCompleted(data) => data.completed_at,
            RouteEvent::StageFailed(data) => data.failed_at,
            RouteEvent::RouteCompleted(data) => data.completed_at,
        }
    }
}

impl RouteEvent {
    /// Returns the route the event belongs to.
    pub fn route_id(&self) -> AggregateId {
        match self {
            RouteEvent::RouteCreated(data) => data.route_id,
            RouteEvent::StageAssigned(data) => data.route_id,
            RouteEvent::StageStarted(data) => data.route_id,
            RouteEvent::StageCompleted(data) => data.route_id,
            RouteEvent::StageFailed(data) => data.route_id,
            RouteEvent::RouteCompleted(data) => data.route_id,
        }
    }
}

/// Data for RouteCreated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCreatedData {
    pub route_id: AggregateId,
    pub order_id: OrderId,
    pub wave_id: WaveId,

    /// The template the route was built from.
    pub template_id: String,

    pub path_type: ProcessPathType,
    pub stage_count: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_handling: Vec<String>,

    pub created_at: DateTime<Utc>,
}

/// Data for StageAssigned event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAssignedData {
    pub route_id: AggregateId,
    pub order_id: OrderId,

    /// Zero-based index of the stage within the route.
    pub stage_index: usize,

    pub stage_type: StageKind,
    pub worker_id: WorkerId,
    pub task_id: TaskId,
    pub assigned_at: DateTime<Utc>,
}

/// Data for StageStarted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStartedData {
    pub route_id: AggregateId,
    pub order_id: OrderId,
    pub stage_index: usize,
    pub stage_type: StageKind,
    pub worker_id: Option<WorkerId>,
    pub task_id: Option<TaskId>,
    pub started_at: DateTime<Utc>,
}

/// Data for StageCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCompletedData {
    pub route_id: AggregateId,
    pub order_id: OrderId,
    pub stage_index: usize,
    pub stage_type: StageKind,
    pub worker_id: Option<WorkerId>,
    pub task_id: Option<TaskId>,
    pub completed_at: DateTime<Utc>,
}

/// Data for StageFailed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFailedData {
    pub route_id: AggregateId,
    pub order_id: OrderId,
    pub stage_index: usize,
    pub stage_type: StageKind,

    /// Absent when the stage failed before a worker was assigned.
    pub task_id: Option<TaskId>,

    /// Reason for the failure.
    pub error: String,

    pub failed_at: DateTime<Utc>,
}

/// Data for RouteCompleted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteCompletedData {
    pub route_id: AggregateId,
    pub order_id: OrderId,
    pub path_type: ProcessPathType,
    pub stage_count: usize,
    pub completed_at: DateTime<Utc>,
}
