//! Route and stage state machines.

use chrono::{DateTime, Utc};
use common::{TaskId, WorkerId};
use serde::{Deserialize, Serialize};

use crate::template::StageKind;

/// The state of a task route.
///
/// State transitions:
/// ```text
/// Pending ──► InProgress ──┬──► Completed
///    │                     │
///    └─────────────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    /// Created, no worker assigned yet.
    #[default]
    Pending,

    /// At least one stage has been assigned.
    InProgress,

    /// Every stage completed (terminal state).
    Completed,

    /// A stage failed (terminal state).
    Failed,
}

impl RouteStatus {
    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteStatus::Completed | RouteStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Pending => "pending",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
            RouteStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The state of a single stage.
///
/// State transitions:
/// ```text
/// Pending ──► Assigned ──► InProgress ──► Completed
///    │           │             │
///    └───────────┴─────────────┴──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    #[default]
    Pending,
    Assigned,
    InProgress,
    Completed,
    Failed,
}

impl StageState {
    /// Returns true if a worker can be assigned in this state.
    pub fn can_assign(&self) -> bool {
        matches!(self, StageState::Pending)
    }

    /// Returns true if the stage can be started in this state.
    pub fn can_start(&self) -> bool {
        matches!(self, StageState::Assigned)
    }

    /// Returns true if the stage can be completed in this state.
    pub fn can_complete(&self) -> bool {
        matches!(self, StageState::InProgress)
    }

    /// Returns true if the stage can be failed in this state.
    pub fn can_fail(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if a worker holds the stage.
    pub fn is_active(&self) -> bool {
        matches!(self, StageState::Assigned | StageState::InProgress)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Completed | StageState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageState::Pending => "pending",
            StageState::Assigned => "assigned",
            StageState::InProgress => "in_progress",
            StageState::Completed => "completed",
            StageState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of one stage within a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    pub stage_type: StageKind,

    pub status: StageState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Set on completion and on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageStatus {
    /// Creates a pending stage of the given kind.
    pub fn pending(stage_type: StageKind) -> Self {
        Self {
            stage_type,
            status: StageState::Pending,
            worker_id: None,
            task_id: None,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }
}
