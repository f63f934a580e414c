//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Page;
use chrono::NaiveDate;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SprintLens - sprint delivery metrics from a task CSV
///
/// Derives velocity, cycle time, defect rate, time slippage, task
/// distribution and cumulative flow from a flat task export and renders
/// them as Markdown or JSON dashboard pages.
///
/// Examples:
///   sprintlens --input tasks.csv
///   sprintlens --input tasks.csv --page delivery --sprint 3
///   sprintlens --input exports/ --format json --output metrics.json
///   sprintlens --input tasks.csv --interactive
///   sprintlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// CSV file or directory of CSV files to load
    ///
    /// Can also be set via SPRINTLENS_INPUT or `data.input` in .sprintlens.toml.
    #[arg(short, long, value_name = "PATH", env = "SPRINTLENS_INPUT")]
    pub input: Option<PathBuf>,

    /// Dashboard page to render
    #[arg(short, long, default_value = "all", value_name = "PAGE")]
    pub page: PageSelection,

    /// Sprint to select (defaults to the first sprint)
    #[arg(short, long, value_name = "N")]
    pub sprint: Option<u32>,

    /// Sprint length in days
    #[arg(long, value_name = "DAYS")]
    pub sprint_days: Option<u32>,

    /// Status value that marks a task as completed
    #[arg(long, value_name = "STATUS")]
    pub done_status: Option<String>,

    /// Fixed start date of sprint 1 (YYYY-MM-DD)
    ///
    /// Defaults to the earliest date in the data.
    #[arg(long, value_name = "DATE")]
    pub anchor_date: Option<NaiveDate>,

    /// Output format (markdown, json)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report (`-` for stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sprintlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Do not mark the selected sprint in per-sprint charts
    #[arg(long)]
    pub no_highlight: bool,

    /// Print the available sprints and exit
    #[arg(long, conflicts_with = "interactive")]
    pub list_sprints: bool,

    /// Read page/sprint commands from stdin and re-render after each
    #[arg(long)]
    pub interactive: bool,

    /// Generate a default .sprintlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Page choice for --page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PageSelection {
    Delivery,
    Throughput,
    Flow,
    All,
}

impl PageSelection {
    /// Pages to render, in navigation order.
    pub fn pages(&self) -> Vec<Page> {
        match self {
            PageSelection::Delivery => vec![Page::Delivery],
            PageSelection::Throughput => vec![Page::Throughput],
            PageSelection::Flow => vec![Page::Flow],
            PageSelection::All => Page::ALL.to_vec(),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.sprint_days == Some(0) {
            return Err("Sprint length must be at least 1 day".to_string());
        }

        if self.sprint == Some(0) {
            return Err("Sprints are numbered from 1".to_string());
        }

        if let Some(ref status) = self.done_status {
            if status.trim().is_empty() {
                return Err("Done status cannot be empty".to_string());
            }
        }

        // Validate input path if provided
        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input does not exist: {}", input.display()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            input: Some(PathBuf::from("tasks.csv")),
            page: PageSelection::All,
            sprint: None,
            sprint_days: None,
            done_status: None,
            anchor_date: None,
            format: None,
            output: None,
            config: None,
            verbose: false,
            quiet: false,
            no_highlight: false,
            list_sprints: false,
            interactive: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.input = None;
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_sprint_values() {
        let mut args = make_args();
        args.input = None;
        args.sprint_days = Some(0);
        assert!(args.validate().is_err());

        args.sprint_days = Some(7);
        args.sprint = Some(0);
        assert!(args.validate().is_err());

        args.sprint = Some(1);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_skipped_for_init_config() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.csv"));
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_page_selection() {
        assert_eq!(PageSelection::Flow.pages(), vec![Page::Flow]);
        assert_eq!(PageSelection::All.pages().len(), 3);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "sprintlens",
            "--page",
            "delivery",
            "--sprint",
            "2",
            "--anchor-date",
            "2024-03-01",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.page, PageSelection::Delivery);
        assert_eq!(args.sprint, Some(2));
        assert_eq!(args.anchor_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(args.format, Some(OutputFormat::Json));
    }
}
