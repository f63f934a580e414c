//! Metric aggregation and statistics.
//!
//! Every function here is a pure grouping over a set of sprint-tagged
//! tasks. They accept anything that iterates `&SprintTask`, so the same
//! code serves the whole table (`table.tasks()`) and a single sprint
//! (`table.filter_sprint(n)`). Results use `BTreeMap` so output order is
//! stable across runs.

use crate::analysis::sprints::TaskTable;
use crate::models::{CycleTimePoint, HoursLogged, SlippagePoint, SprintSummary, SprintTask};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Story points of done tasks per sprint.
///
/// Sprints without any done task are absent rather than zero.
pub fn compute_velocity<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
    done_status: &str,
) -> BTreeMap<u32, f64> {
    let mut velocity = BTreeMap::new();

    for task in tasks.into_iter().filter(|t| t.is_done(done_status)) {
        *velocity.entry(task.sprint).or_insert(0.0) += task.record.story_points;
    }

    velocity
}

/// Defects reported per sprint, across all statuses.
pub fn compute_defect_rate<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
) -> BTreeMap<u32, u64> {
    let mut defects = BTreeMap::new();

    for task in tasks {
        *defects.entry(task.sprint).or_insert(0) += task.record.defects_reported;
    }

    defects
}

/// Cycle time of each task, in input order.
pub fn compute_cycle_times<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
) -> Vec<CycleTimePoint> {
    tasks
        .into_iter()
        .map(|t| CycleTimePoint {
            task_id: t.record.task_id.clone(),
            cycle_time_days: t.cycle_time_days,
        })
        .collect()
}

/// Actual minus estimated hours of each task, in input order.
pub fn compute_time_slippage<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
) -> Vec<SlippagePoint> {
    tasks
        .into_iter()
        .map(|t| SlippagePoint {
            task_id: t.record.task_id.clone(),
            slippage_hours: t.record.time_slippage(),
        })
        .collect()
}

/// Number of tasks per task type.
pub fn compute_task_distribution<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
) -> BTreeMap<String, usize> {
    let mut dist = BTreeMap::new();

    for task in tasks {
        *dist.entry(task.record.task_type.clone()).or_insert(0) += 1;
    }

    dist
}

/// Number of rows per `(date, status)`. Iterates by date, then status.
pub fn compute_cumulative_flow<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
) -> BTreeMap<(NaiveDate, String), usize> {
    let mut flow = BTreeMap::new();

    for task in tasks {
        *flow
            .entry((task.record.date, task.record.status.clone()))
            .or_insert(0) += 1;
    }

    flow
}

/// Number of done tasks per sprint. Sprints without done tasks are absent.
pub fn compute_tasks_completed<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
    done_status: &str,
) -> BTreeMap<u32, usize> {
    let mut completed = BTreeMap::new();

    for task in tasks.into_iter().filter(|t| t.is_done(done_status)) {
        *completed.entry(task.sprint).or_insert(0) += 1;
    }

    completed
}

/// Estimated and actual hours per sprint.
pub fn compute_hours_logged<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
) -> BTreeMap<u32, HoursLogged> {
    let mut hours: BTreeMap<u32, HoursLogged> = BTreeMap::new();

    for task in tasks {
        let entry = hours.entry(task.sprint).or_default();
        entry.estimated += task.record.estimated_hours;
        entry.actual += task.record.actual_hours;
    }

    hours
}

/// Defects reported per resource.
pub fn compute_defects_by_resource<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
) -> BTreeMap<String, u64> {
    let mut defects = BTreeMap::new();

    for task in tasks {
        *defects.entry(task.record.resource.clone()).or_insert(0) += task.record.defects_reported;
    }

    defects
}

/// Done tasks per calendar month (`YYYY-MM`) of their `date`.
pub fn compute_monthly_completions<'a>(
    tasks: impl IntoIterator<Item = &'a SprintTask>,
    done_status: &str,
) -> BTreeMap<String, usize> {
    let mut months = BTreeMap::new();

    for task in tasks.into_iter().filter(|t| t.is_done(done_status)) {
        *months
            .entry(task.record.date.format("%Y-%m").to_string())
            .or_insert(0) += 1;
    }

    months
}

/// Distinct statuses in a cumulative-flow table, sorted.
pub fn flow_statuses(flow: &BTreeMap<(NaiveDate, String), usize>) -> Vec<String> {
    let mut statuses: Vec<String> = flow.keys().map(|(_, status)| status.clone()).collect();
    statuses.sort();
    statuses.dedup();
    statuses
}

/// Headline numbers for one sprint of the table.
pub fn summarize_sprint(table: &TaskTable, sprint: u32, done_status: &str) -> SprintSummary {
    let tasks = table.filter_sprint(sprint);
    let done: Vec<&&SprintTask> = tasks.iter().filter(|t| t.is_done(done_status)).collect();

    let mean_cycle_time_days = if tasks.is_empty() {
        None
    } else {
        let total: i64 = tasks.iter().map(|t| t.cycle_time_days).sum();
        Some(total as f64 / tasks.len() as f64)
    };

    SprintSummary {
        sprint,
        tasks: tasks.len(),
        tasks_done: done.len(),
        points_completed: done.iter().map(|t| t.record.story_points).sum(),
        defects: tasks.iter().map(|t| t.record.defects_reported).sum(),
        mean_cycle_time_days,
        total_slippage_hours: tasks.iter().map(|t| t.record.time_slippage()).sum(),
    }
}
