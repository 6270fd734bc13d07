//! Shared identifier types used across the routing workspace.

mod types;

pub use types::{AggregateId, OrderId, TaskId, WaveId, WorkerId};
