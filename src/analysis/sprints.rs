//! Sprint assignment.
//!
//! Every task is bucketed into a fixed-length sprint counted from a single
//! anchor date. The anchor is resolved once for the whole table and the
//! sprint number is stored on each [`SprintTask`], so subsets taken later
//! keep the numbering of the full table.

use crate::config::SprintConfig;
use crate::error::DataError;
use crate::models::{SprintTask, TaskRecord};
use chrono::{Duration, NaiveDate};
use tracing::debug;

/// How tasks are bucketed into sprints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintSettings {
    pub length_days: u32,
    /// Start of sprint 1. `None` uses the earliest task date.
    pub anchor_date: Option<NaiveDate>,
}

impl Default for SprintSettings {
    fn default() -> Self {
        Self::from(&SprintConfig::default())
    }
}

impl From<&SprintConfig> for SprintSettings {
    fn from(config: &SprintConfig) -> Self {
        Self {
            length_days: config.length_days,
            anchor_date: config.anchor_date,
        }
    }
}

/// Start date and length of sprint 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SprintAnchor {
    start: NaiveDate,
    length_days: u32,
}

impl SprintAnchor {
    pub fn new(start: NaiveDate, length_days: u32) -> Result<Self, DataError> {
        if length_days == 0 {
            return Err(DataError::InvalidSprintLength);
        }
        Ok(Self { start, length_days })
    }

    /// Anchor at the earliest `date` in `records`.
    pub fn earliest(records: &[TaskRecord], length_days: u32) -> Result<Self, DataError> {
        let start = records
            .iter()
            .map(|r| r.date)
            .min()
            .ok_or(DataError::EmptyTable)?;
        Self::new(start, length_days)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn length_days(&self) -> u32 {
        self.length_days
    }

    /// 1-based sprint containing `date`, or `None` before the anchor.
    pub fn sprint_for(&self, date: NaiveDate) -> Option<u32> {
        let days = (date - self.start).num_days();
        if days < 0 {
            return None;
        }
        u32::try_from(days / i64::from(self.length_days))
            .ok()
            .map(|n| n + 1)
    }

    /// First day of `sprint`.
    pub fn sprint_start(&self, sprint: u32) -> NaiveDate {
        let offset = i64::from(sprint.saturating_sub(1)) * i64::from(self.length_days);
        self.start + Duration::days(offset)
    }
}

/// The loaded task table with sprints assigned. Immutable once built.
#[derive(Debug, Clone)]
pub struct TaskTable {
    anchor: SprintAnchor,
    tasks: Vec<SprintTask>,
}

impl TaskTable {
    pub fn anchor(&self) -> SprintAnchor {
        self.anchor
    }

    pub fn tasks(&self) -> &[SprintTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Distinct sprints present in the table, ascending.
    pub fn sprints(&self) -> Vec<u32> {
        let mut sprints: Vec<u32> = self.tasks.iter().map(|t| t.sprint).collect();
        sprints.sort_unstable();
        sprints.dedup();
        sprints
    }

    pub fn contains_sprint(&self, sprint: u32) -> bool {
        self.tasks.iter().any(|t| t.sprint == sprint)
    }

    /// Tasks belonging to `sprint`, in input order.
    pub fn filter_sprint(&self, sprint: u32) -> Vec<&SprintTask> {
        self.tasks.iter().filter(|t| t.sprint == sprint).collect()
    }
}

/// Resolve the anchor and attach a sprint and cycle time to every record.
pub fn assign_sprints(
    records: Vec<TaskRecord>,
    settings: &SprintSettings,
) -> Result<TaskTable, DataError> {
    if records.is_empty() {
        return Err(DataError::EmptyTable);
    }

    let anchor = match settings.anchor_date {
        Some(start) => SprintAnchor::new(start, settings.length_days)?,
        None => SprintAnchor::earliest(&records, settings.length_days)?,
    };
    debug!(
        "Sprint anchor {} ({} day sprints)",
        anchor.start(),
        anchor.length_days()
    );

    let tasks = records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| {
            let sprint = anchor
                .sprint_for(record.date)
                .ok_or_else(|| DataError::DateBeforeAnchor {
                    location: match record.source {
                        Some(ref source) => source.to_string(),
                        None => format!("row {}", idx + 1),
                    },
                    date: record.date,
                    anchor: anchor.start(),
                })?;
            let cycle_time_days = record.cycle_time_days();
            Ok(SprintTask {
                record,
                sprint,
                cycle_time_days,
            })
        })
        .collect::<Result<Vec<_>, DataError>>()?;

    Ok(TaskTable { anchor, tasks })
}
