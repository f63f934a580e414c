//! Data models for the metrics pipeline.
//!
//! This module contains the task records read from CSV, the per-task
//! derived values, and the chart/report structures handed to the
//! presentation layer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One row of the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    /// Date the row was recorded; drives sprint assignment.
    pub date: NaiveDate,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub story_points: f64,
    pub defects_reported: u64,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    pub task_type: String,
    /// Owner of the task.
    pub resource: String,
    /// Where the row was read from, when it came from a file.
    #[serde(skip)]
    pub source: Option<RecordSource>,
}

/// File and 1-based data row a record was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSource {
    pub path: PathBuf,
    pub row: usize,
}

impl fmt::Display for RecordSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, row {}", self.path.display(), self.row)
    }
}

impl TaskRecord {
    /// Elapsed days between start and end. Negative when the dates are inverted.
    pub fn cycle_time_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// Actual minus estimated hours.
    pub fn time_slippage(&self) -> f64 {
        self.actual_hours - self.estimated_hours
    }
}

/// A task record with its sprint resolved against the global anchor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SprintTask {
    #[serde(flatten)]
    pub record: TaskRecord,
    /// 1-based sprint index.
    pub sprint: u32,
    pub cycle_time_days: i64,
}

impl SprintTask {
    pub fn is_done(&self, done_status: &str) -> bool {
        self.record.status == done_status
    }
}

/// Cycle time of a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleTimePoint {
    pub task_id: String,
    pub cycle_time_days: i64,
}

/// Time slippage of a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlippagePoint {
    pub task_id: String,
    pub slippage_hours: f64,
}

/// Estimated and actual hours summed over a sprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoursLogged {
    pub estimated: f64,
    pub actual: f64,
}

/// Headline numbers for one sprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintSummary {
    pub sprint: u32,
    pub tasks: usize,
    pub tasks_done: usize,
    pub points_completed: f64,
    pub defects: u64,
    /// Mean cycle time in days, `None` for an empty sprint.
    pub mean_cycle_time_days: Option<f64>,
    pub total_slippage_hours: f64,
}

/// Dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// Velocity, cycle time and defect rate.
    Delivery,
    /// Completed tasks, hours logged, defects by resource, monthly trend.
    Throughput,
    /// Time slippage, task distribution and cumulative flow.
    Flow,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Delivery, Page::Throughput, Page::Flow];

    /// 1-based page number as shown on the navigation buttons.
    pub fn number(&self) -> u8 {
        match self {
            Page::Delivery => 1,
            Page::Throughput => 2,
            Page::Flow => 3,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Delivery => "Delivery",
            Page::Throughput => "Throughput",
            Page::Flow => "Flow",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page {}: {}", self.number(), self.title())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "delivery" => Ok(Page::Delivery),
            "2" | "throughput" => Ok(Page::Throughput),
            "3" | "flow" => Ok(Page::Flow),
            other => Err(format!("Unknown page: {}", other)),
        }
    }
}

/// How a chart should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Area,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Line => write!(f, "line"),
            ChartKind::Pie => write!(f, "pie"),
            ChartKind::Area => write!(f, "area"),
        }
    }
}

/// A single data point of a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: String,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Marks the point belonging to the selected sprint.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub highlighted: bool,
}

impl ChartPoint {
    pub fn new(x: impl Into<String>, y: f64) -> Self {
        Self {
            x: x.into(),
            y,
            category: None,
            highlighted: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn highlighted(mut self, highlighted: bool) -> Self {
        self.highlighted = highlighted;
        self
    }
}

/// The tabular contract a chart renderer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub x_field: String,
    pub y_field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,
    pub points: Vec<ChartPoint>,
}

impl Chart {
    pub fn new(
        id: &str,
        title: &str,
        kind: ChartKind,
        x_field: &str,
        y_field: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind,
            x_field: x_field.to_string(),
            y_field: y_field.to_string(),
            category_field: None,
            points: Vec::new(),
        }
    }

    pub fn with_category_field(mut self, field: &str) -> Self {
        self.category_field = Some(field.to_string());
        self
    }

    pub fn with_points(mut self, points: Vec<ChartPoint>) -> Self {
        self.points = points;
        self
    }

    /// Sum of all y values.
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.y).sum()
    }
}

/// A rendered dashboard page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    pub page: Page,
    pub title: String,
    pub selected_sprint: u32,
    pub sprint_options: Vec<u32>,
    pub charts: Vec<Chart>,
}

/// Metadata about the generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub input: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub rows: usize,
    pub anchor_date: NaiveDate,
    pub sprint_length_days: u32,
    pub sprint_count: usize,
    pub selected_sprint: u32,
}

/// The complete dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub metadata: ReportMetadata,
    /// Summary of the selected sprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SprintSummary>,
    pub pages: Vec<PageView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TaskRecord {
        TaskRecord {
            task_id: "T-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            status: "Done".to_string(),
            story_points: 5.0,
            defects_reported: 1,
            estimated_hours: 8.0,
            actual_hours: 11.5,
            task_type: "Feature".to_string(),
            resource: "alice".to_string(),
            source: None,
        }
    }

    #[test]
    fn test_cycle_time_days() {
        assert_eq!(record().cycle_time_days(), 7);
    }

    #[test]
    fn test_cycle_time_negative_when_dates_inverted() {
        let mut r = record();
        r.end_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(r.cycle_time_days(), -2);
    }

    #[test]
    fn test_time_slippage() {
        assert_eq!(record().time_slippage(), 3.5);
    }

    #[test]
    fn test_record_source_display() {
        let source = RecordSource {
            path: PathBuf::from("exports/b.csv"),
            row: 3,
        };
        assert_eq!(source.to_string(), "exports/b.csv, row 3");
    }

    #[test]
    fn test_page_from_str() {
        assert_eq!("1".parse::<Page>(), Ok(Page::Delivery));
        assert_eq!("Throughput".parse::<Page>(), Ok(Page::Throughput));
        assert_eq!(" flow ".parse::<Page>(), Ok(Page::Flow));
        assert!("4".parse::<Page>().is_err());
    }

    #[test]
    fn test_page_display() {
        assert_eq!(Page::Flow.to_string(), "Page 3: Flow");
    }

    #[test]
    fn test_chart_point_serialization_skips_defaults() {
        let json = serde_json::to_string(&ChartPoint::new("1", 2.0)).unwrap();
        assert!(!json.contains("category"));
        assert!(!json.contains("highlighted"));

        let json = serde_json::to_string(&ChartPoint::new("1", 2.0).highlighted(true)).unwrap();
        assert!(json.contains("\"highlighted\":true"));
    }

    #[test]
    fn test_chart_total() {
        let chart = Chart::new("v", "Velocity", ChartKind::Bar, "sprint", "story_points")
            .with_points(vec![ChartPoint::new("1", 3.0), ChartPoint::new("2", 4.5)]);
        assert_eq!(chart.total(), 7.5);
    }
}
