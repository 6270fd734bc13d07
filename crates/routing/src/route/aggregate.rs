//! Task route aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, OrderId, TaskId, WaveId, WorkerId};
use route_store::{RouteRecord, Version};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::template::{ProcessPathType, StageTemplate};

use super::{
    RouteError, RouteEvent, RouteStatus, StageState, StageStatus,
    events::{
        RouteCompletedData, RouteCreatedData, StageAssignedData, StageCompletedData,
        StageFailedData, StageStartedData,
    },
};

/// Task route aggregate root.
///
/// Drives one fulfillment attempt of an order through the stages of the
/// template it was built from. Exactly one stage is current at a time, stages
/// run strictly in order and a completed or failed route never changes again.
///
/// Every operation either applies its whole change and buffers its events,
/// or returns an error and leaves the route untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRoute {
    route_id: AggregateId,
    order_id: OrderId,
    wave_id: WaveId,
    template_id: String,
    path_type: ProcessPathType,

    /// Index of the current stage. Equals the stage count once completed.
    current_stage_idx: usize,

    stages: Vec<StageStatus>,
    status: RouteStatus,

    #[serde(default)]
    special_handling: Vec<String>,

    /// Decision ID from process-path classification, if one was supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    process_path_id: Option<String>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,

    /// Set only when the route completes successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,

    /// Version the route was loaded at. Owned by the store.
    #[serde(skip)]
    version: Version,

    #[serde(skip)]
    pending_events: Vec<RouteEvent>,
}

impl Aggregate for TaskRoute {
    type Event = RouteEvent;
    type Error = RouteError;

    fn aggregate_type() -> &'static str {
        "TaskRoute"
    }

    fn id(&self) -> AggregateId {
        self.route_id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn to_record(&self) -> Result<RouteRecord, serde_json::Error> {
        RouteRecord::from_state(
            self.route_id,
            self.order_id.as_str(),
            self.status.as_str(),
            self.created_at,
            self,
        )
    }

    fn pending_events(&self) -> &[RouteEvent] {
        &self.pending_events
    }

    fn take_pending_events(&mut self) -> Vec<RouteEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

// Construction
impl TaskRoute {
    /// Builds a pending route from a template.
    ///
    /// Every stage starts pending and the first stage is current. Emits
    /// `RouteCreated`.
    pub fn new(
        order_id: OrderId,
        wave_id: WaveId,
        template: &StageTemplate,
        special_handling: Vec<String>,
        process_path_id: Option<String>,
    ) -> Result<Self, RouteError> {
        if order_id.is_blank() {
            return Err(RouteError::MissingOrderId);
        }
        if template.stages.is_empty() {
            return Err(RouteError::EmptyTemplate {
                template_id: template.template_id.clone(),
            });
        }

        let now = Utc::now();
        let route_id = AggregateId::new();
        let stages: Vec<_> = template
            .stages
            .iter()
            .map(|definition| StageStatus::pending(definition.stage_type))
            .collect();

        let created = RouteEvent::RouteCreated(RouteCreatedData {
            route_id,
            order_id: order_id.clone(),
            wave_id: wave_id.clone(),
            template_id: template.template_id.clone(),
            path_type: template.path_type.clone(),
            stage_count: stages.len(),
            special_handling: special_handling.clone(),
            created_at: now,
        });

        Ok(Self {
            route_id,
            order_id,
            wave_id,
            template_id: template.template_id.clone(),
            path_type: template.path_type.clone(),
            current_stage_idx: 0,
            stages,
            status: RouteStatus::Pending,
            special_handling,
            process_path_id,
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: Version::initial(),
            pending_events: vec![created],
        })
    }
}

// Transitions
impl TaskRoute {
    /// Binds a worker task to the current stage.
    ///
    /// The stage must be pending. Moves a pending route to in progress.
    /// Emits `StageAssigned`.
    pub fn assign_worker_to_current_stage(
        &mut self,
        worker_id: WorkerId,
        task_id: TaskId,
    ) -> Result<(), RouteError> {
        let index = self.current_index()?;
        let stage = &self.stages[index];
        if !stage.status.can_assign() {
            return Err(RouteError::StageNotPending {
                state: stage.status,
            });
        }
        if worker_id.is_blank() {
            return Err(RouteError::MissingWorkerId);
        }
        if task_id.is_blank() {
            return Err(RouteError::MissingTaskId);
        }

        let now = Utc::now();
        let event = RouteEvent::StageAssigned(StageAssignedData {
            route_id: self.route_id,
            order_id: self.order_id.clone(),
            stage_index: index,
            stage_type: stage.stage_type,
            worker_id: worker_id.clone(),
            task_id: task_id.clone(),
            assigned_at: now,
        });

        let stage = &mut self.stages[index];
        stage.status = StageState::Assigned;
        stage.worker_id = Some(worker_id);
        stage.task_id = Some(task_id);
        if self.status == RouteStatus::Pending {
            self.status = RouteStatus::InProgress;
        }
        self.record(event, now);
        Ok(())
    }

    /// Starts the current stage.
    ///
    /// The stage must be assigned. Emits `StageStarted`.
    pub fn start_current_stage(&mut self) -> Result<(), RouteError> {
        let index = self.current_index()?;
        let stage = &self.stages[index];
        if !stage.status.can_start() {
            return Err(RouteError::StageNotAssigned {
                state: stage.status,
            });
        }

        let now = Utc::now();
        let event = RouteEvent::StageStarted(StageStartedData {
            route_id: self.route_id,
            order_id: self.order_id.clone(),
            stage_index: index,
            stage_type: stage.stage_type,
            worker_id: stage.worker_id.clone(),
            task_id: stage.task_id.clone(),
            started_at: now,
        });

        let stage = &mut self.stages[index];
        stage.status = StageState::InProgress;
        stage.started_at = Some(now);
        self.record(event, now);
        Ok(())
    }

    /// Completes the current stage and advances to the next one.
    ///
    /// The stage must be in progress. Emits `StageCompleted`, followed by
    /// `RouteCompleted` when this was the last stage.
    pub fn complete_current_stage(&mut self) -> Result<(), RouteError> {
        let index = self.current_index()?;
        let stage = &self.stages[index];
        if !stage.status.can_complete() {
            return Err(RouteError::StageNotInProgress {
                state: stage.status,
            });
        }

        let now = Utc::now();
        let event = RouteEvent::StageCompleted(StageCompletedData {
            route_id: self.route_id,
            order_id: self.order_id.clone(),
            stage_index: index,
            stage_type: stage.stage_type,
            worker_id: stage.worker_id.clone(),
            task_id: stage.task_id.clone(),
            completed_at: now,
        });

        let stage = &mut self.stages[index];
        stage.status = StageState::Completed;
        stage.completed_at = Some(now);
        self.current_stage_idx += 1;
        self.record(event, now);

        if self.current_stage_idx == self.stages.len() {
            self.status = RouteStatus::Completed;
            self.completed_at = Some(now);
            let event = RouteEvent::RouteCompleted(RouteCompletedData {
                route_id: self.route_id,
                order_id: self.order_id.clone(),
                path_type: self.path_type.clone(),
                stage_count: self.stages.len(),
                completed_at: now,
            });
            self.record(event, now);
        }

        Ok(())
    }

    /// Fails the current stage, which fails the whole route.
    ///
    /// Accepted while the stage is pending, assigned or in progress.
    /// Emits `StageFailed`.
    pub fn fail_current_stage(&mut self, reason: impl Into<String>) -> Result<(), RouteError> {
        let index = self.current_index()?;
        let reason = reason.into();
        let stage = &self.stages[index];

        let now = Utc::now();
        let event = RouteEvent::StageFailed(StageFailedData {
            route_id: self.route_id,
            order_id: self.order_id.clone(),
            stage_index: index,
            stage_type: stage.stage_type,
            task_id: stage.task_id.clone(),
            error: reason.clone(),
            failed_at: now,
        });

        let stage = &mut self.stages[index];
        stage.status = StageState::Failed;
        stage.error = Some(reason);
        stage.completed_at = Some(now);
        self.status = RouteStatus::Failed;
        self.record(event, now);
        Ok(())
    }

    /// Returns the index of the current stage if the route can still change.
    fn current_index(&self) -> Result<usize, RouteError> {
        match self.status {
            RouteStatus::Completed => return Err(RouteError::RouteAlreadyCompleted),
            RouteStatus::Failed => return Err(RouteError::RouteAlreadyFailed),
            RouteStatus::Pending | RouteStatus::InProgress => {}
        }

        if self.current_stage_idx < self.stages.len() {
            Ok(self.current_stage_idx)
        } else {
            Err(RouteError::NoCurrentStage)
        }
    }

    fn record(&mut self, event: RouteEvent, at: DateTime<Utc>) {
        self.updated_at = at;
        self.pending_events.push(event);
    }
}

// Query methods
impl TaskRoute {
    /// Returns the route ID.
    pub fn route_id(&self) -> AggregateId {
        self.route_id
    }

    /// Returns the order the route fulfils.
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Returns the wave the order was released in.
    pub fn wave_id(&self) -> &WaveId {
        &self.wave_id
    }

    /// Returns the ID of the template the route was built from.
    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    /// Returns the process-path type.
    pub fn path_type(&self) -> &ProcessPathType {
        &self.path_type
    }

    /// Returns the current route status.
    pub fn status(&self) -> RouteStatus {
        self.status
    }

    /// Returns every stage in order.
    pub fn stages(&self) -> &[StageStatus] {
        &self.stages
    }

    /// Returns the index of the current stage.
    pub fn current_stage_index(&self) -> usize {
        self.current_stage_idx
    }

    /// Returns the current stage, or None once every stage completed.
    pub fn current_stage(&self) -> Option<&StageStatus> {
        self.stages.get(self.current_stage_idx)
    }

    /// Returns (completed stages, total stages).
    pub fn progress(&self) -> (usize, usize) {
        let completed = self
            .stages
            .iter()
            .filter(|s| s.status == StageState::Completed)
            .count();
        (completed, self.stages.len())
    }

    /// Returns the special-handling tags.
    pub fn special_handling(&self) -> &[String] {
        &self.special_handling
    }

    /// Returns true if the route carries the given special-handling tag.
    pub fn has_special_handling(&self, tag: &str) -> bool {
        self.special_handling.iter().any(|t| t == tag)
    }

    /// Returns the process-path decision ID.
    pub fn process_path_id(&self) -> Option<&str> {
        self.process_path_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns true if every stage completed.
    pub fn is_completed(&self) -> bool {
        self.status == RouteStatus::Completed
    }

    /// Returns true if a stage failed.
    pub fn is_failed(&self) -> bool {
        self.status == RouteStatus::Failed
    }

    /// Returns true if the route can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
