//! Dashboard pages.
//!
//! A [`Dashboard`] turns the immutable task table plus a selected sprint
//! into [`PageView`]s: the chart tables for one page. It holds no state of
//! its own; [`Session`] tracks the current page and sprint and re-renders
//! when an event arrives.

pub mod session;

pub use session::{parse_command, Session, SessionCommand};

use crate::analysis::{
    compute_cumulative_flow, compute_cycle_times, compute_defect_rate,
    compute_defects_by_resource, compute_hours_logged, compute_monthly_completions,
    compute_task_distribution, compute_tasks_completed, compute_time_slippage, compute_velocity,
    flow_statuses, TaskTable,
};
use crate::config::Config;
use crate::models::{Chart, ChartKind, ChartPoint, Page, PageView};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

/// Errors from page rendering.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DashboardError {
    #[error("Sprint {sprint} has no tasks (available: {available:?})")]
    UnknownSprint { sprint: u32, available: Vec<u32> },
}

/// Rendering options.
#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub done_status: String,
    /// Mark the selected sprint in per-sprint charts.
    pub highlight_selected: bool,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DashboardOptions {
    fn from(config: &Config) -> Self {
        Self {
            done_status: config.sprint.done_status.clone(),
            highlight_selected: config.report.highlight_selected,
        }
    }
}

/// Renders dashboard pages from a task table.
#[derive(Debug, Clone)]
pub struct Dashboard<'a> {
    table: &'a TaskTable,
    options: DashboardOptions,
}

impl<'a> Dashboard<'a> {
    pub fn new(table: &'a TaskTable, options: DashboardOptions) -> Self {
        Self { table, options }
    }

    pub fn table(&self) -> &'a TaskTable {
        self.table
    }

    /// Sprints offered by the sprint selector, ascending.
    pub fn sprint_options(&self) -> Vec<u32> {
        self.table.sprints()
    }

    /// The initially selected sprint: the first one with tasks.
    pub fn default_sprint(&self) -> u32 {
        self.sprint_options().first().copied().unwrap_or(1)
    }

    /// Resolve a requested sprint, falling back to the default.
    pub fn resolve_sprint(&self, requested: Option<u32>) -> Result<u32, DashboardError> {
        match requested {
            None => Ok(self.default_sprint()),
            Some(sprint) if self.table.contains_sprint(sprint) => Ok(sprint),
            Some(sprint) => Err(DashboardError::UnknownSprint {
                sprint,
                available: self.sprint_options(),
            }),
        }
    }

    /// Render one page for the selected sprint.
    pub fn render(&self, page: Page, sprint: u32) -> Result<PageView, DashboardError> {
        let sprint = self.resolve_sprint(Some(sprint))?;
        debug!("Rendering {} for sprint {}", page, sprint);

        let charts = match page {
            Page::Delivery => self.delivery_charts(sprint),
            Page::Throughput => self.throughput_charts(sprint),
            Page::Flow => self.flow_charts(sprint),
        };

        Ok(PageView {
            page,
            title: page.title().to_string(),
            selected_sprint: sprint,
            sprint_options: self.sprint_options(),
            charts,
        })
    }

    fn highlight(&self, sprint: u32, selected: u32) -> bool {
        self.options.highlight_selected && sprint == selected
    }

    /// Velocity, cycle time for the selected sprint, defect rate.
    fn delivery_charts(&self, selected: u32) -> Vec<Chart> {
        let tasks = self.table.tasks();
        let done = self.options.done_status.as_str();

        let velocity = compute_velocity(tasks, done)
            .into_iter()
            .map(|(sprint, points)| {
                ChartPoint::new(sprint.to_string(), points)
                    .highlighted(self.highlight(sprint, selected))
            })
            .collect();

        let cycle_time = compute_cycle_times(self.table.filter_sprint(selected))
            .into_iter()
            .map(|p| ChartPoint::new(p.task_id, p.cycle_time_days as f64))
            .collect();

        let defect_rate = compute_defect_rate(tasks)
            .into_iter()
            .map(|(sprint, defects)| {
                ChartPoint::new(sprint.to_string(), defects as f64)
                    .highlighted(self.highlight(sprint, selected))
            })
            .collect();

        vec![
            Chart::new("velocity", "Velocity", ChartKind::Bar, "sprint", "story_points")
                .with_points(velocity),
            Chart::new(
                "cycle-time",
                "Cycle Time",
                ChartKind::Line,
                "task_id",
                "cycle_time_days",
            )
            .with_points(cycle_time),
            Chart::new(
                "defect-rate",
                "Defect Rate",
                ChartKind::Bar,
                "sprint",
                "defects_reported",
            )
            .with_points(defect_rate),
        ]
    }

    /// Completed tasks, hours logged, defects by resource, monthly trend.
    fn throughput_charts(&self, selected: u32) -> Vec<Chart> {
        let tasks = self.table.tasks();
        let done = self.options.done_status.as_str();

        let completed = compute_tasks_completed(tasks, done)
            .into_iter()
            .map(|(sprint, count)| {
                ChartPoint::new(sprint.to_string(), count as f64)
                    .highlighted(self.highlight(sprint, selected))
            })
            .collect();

        let hours = compute_hours_logged(tasks)
            .into_iter()
            .flat_map(|(sprint, logged)| {
                let highlighted = self.highlight(sprint, selected);
                [
                    ChartPoint::new(sprint.to_string(), logged.estimated)
                        .with_category("estimated")
                        .highlighted(highlighted),
                    ChartPoint::new(sprint.to_string(), logged.actual)
                        .with_category("actual")
                        .highlighted(highlighted),
                ]
            })
            .collect();

        let by_resource = compute_defects_by_resource(tasks)
            .into_iter()
            .map(|(resource, defects)| ChartPoint::new(resource, defects as f64))
            .collect();

        let monthly = compute_monthly_completions(tasks, done)
            .into_iter()
            .map(|(month, count)| ChartPoint::new(month, count as f64))
            .collect();

        vec![
            Chart::new(
                "tasks-completed",
                "Tasks Completed",
                ChartKind::Bar,
                "sprint",
                "tasks_completed",
            )
            .with_points(completed),
            Chart::new("hours-logged", "Hours Logged", ChartKind::Bar, "sprint", "hours")
                .with_category_field("kind")
                .with_points(hours),
            Chart::new(
                "defects-by-resource",
                "Defects Reported by Resource",
                ChartKind::Bar,
                "resource",
                "defects_reported",
            )
            .with_points(by_resource),
            Chart::new(
                "monthly-completions",
                "Month-on-Month Tasks Completed",
                ChartKind::Line,
                "month",
                "tasks_completed",
            )
            .with_points(monthly),
        ]
    }

    /// Time slippage for the selected sprint, task distribution, cumulative flow.
    fn flow_charts(&self, selected: u32) -> Vec<Chart> {
        let tasks = self.table.tasks();

        let slippage = compute_time_slippage(self.table.filter_sprint(selected))
            .into_iter()
            .map(|p| ChartPoint::new(p.task_id, p.slippage_hours))
            .collect();

        let distribution = compute_task_distribution(tasks)
            .into_iter()
            .map(|(task_type, count)| ChartPoint::new(task_type, count as f64))
            .collect();

        // Stacked areas need every status at every date
        let counts = compute_cumulative_flow(tasks);
        let statuses = flow_statuses(&counts);
        let dates: BTreeSet<NaiveDate> = counts.keys().map(|(date, _)| *date).collect();
        let (counts, statuses) = (&counts, &statuses);
        let flow = dates
            .into_iter()
            .flat_map(|date| {
                statuses.iter().map(move |status| {
                    let count = counts.get(&(date, status.clone())).copied().unwrap_or(0);
                    ChartPoint::new(date.to_string(), count as f64).with_category(status.as_str())
                })
            })
            .collect();

        vec![
            Chart::new(
                "time-slippage",
                "Time Slippage",
                ChartKind::Bar,
                "task_id",
                "slippage_hours",
            )
            .with_points(slippage),
            Chart::new(
                "task-distribution",
                "Task Distribution",
                ChartKind::Pie,
                "task_type",
                "count",
            )
            .with_points(distribution),
            Chart::new(
                "cumulative-flow",
                "Cumulative Flow Diagram",
                ChartKind::Area,
                "date",
                "count",
            )
            .with_category_field("status")
            .with_points(flow),
        ]
    }
}
