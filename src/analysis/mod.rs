//! Metrics aggregation.
//!
//! Sprint assignment and the per-sprint, per-task and per-date series
//! derived from the task table.

pub mod aggregator;
pub mod sprints;

pub use aggregator::*;
pub use sprints::{assign_sprints, SprintSettings, TaskTable};
