//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sprintlens.toml` files.

use crate::cli::OutputFormat;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".sprintlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Sprint bucketing settings.
    #[serde(default)]
    pub sprint: SprintConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path (`-` for stdout).
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "-".to_string()
}

/// Input CSV settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV file or directory of CSV files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,

    /// chrono formats tried, in order, for date-only cells.
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input: None,
            date_formats: default_date_formats(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_date_formats() -> Vec<String> {
    vec!["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_delimiter() -> char {
    ','
}

/// Sprint bucketing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintConfig {
    /// Sprint length in days.
    #[serde(default = "default_length_days")]
    pub length_days: u32,

    /// Status value that marks a task as completed.
    #[serde(default = "default_done_status")]
    pub done_status: String,

    /// Fixed date for sprint 1. Defaults to the earliest date in the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_date: Option<NaiveDate>,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            length_days: default_length_days(),
            done_status: default_done_status(),
            anchor_date: None,
        }
    }
}

fn default_length_days() -> u32 {
    14
}

fn default_done_status() -> String {
    "Done".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the selected sprint's summary table.
    #[serde(default = "default_true")]
    pub include_summary: bool,

    /// Mark the selected sprint in per-sprint charts.
    #[serde(default = "default_true")]
    pub highlight_selected: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            highlight_selected: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.data.input = Some(input.clone());
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(days) = args.sprint_days {
            self.sprint.length_days = days;
        }
        if let Some(ref status) = args.done_status {
            self.sprint.done_status = status.clone();
        }
        if let Some(anchor) = args.anchor_date {
            self.sprint.anchor_date = Some(anchor);
        }

        if args.no_highlight {
            self.report.highlight_selected = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level for the merged settings. `quiet` wins over `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sprint.length_days, 14);
        assert_eq!(config.sprint.done_status, "Done");
        assert!(config.sprint.anchor_date.is_none());
        assert_eq!(config.general.output, "-");
        assert!(config.data.date_formats.contains(&"%Y-%m-%d".to_string()));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "metrics.md"
format = "json"
verbose = true

[data]
input = "data/tasks.csv"
delimiter = ";"

[sprint]
length_days = 7
done_status = "Closed"
anchor_date = "2024-01-01"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "metrics.md");
        assert_eq!(config.general.format, OutputFormat::Json);
        assert!(config.general.verbose);
        assert_eq!(config.data.input, Some(PathBuf::from("data/tasks.csv")));
        assert_eq!(config.data.delimiter, ';');
        assert_eq!(config.sprint.length_days, 7);
        assert_eq!(config.sprint.done_status, "Closed");
        assert_eq!(
            config.sprint.anchor_date,
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        // Untouched section keeps its defaults
        assert!(config.report.include_summary);
    }

    #[test]
    fn test_merge_with_args_only_overrides_given_values() {
        let mut config: Config = toml::from_str(
            r#"
[sprint]
length_days = 7
done_status = "Closed"
"#,
        )
        .unwrap();

        let mut args = make_args();
        args.done_status = Some("Done".to_string());
        args.no_highlight = true;
        config.merge_with_args(&args);

        assert_eq!(config.sprint.length_days, 7);
        assert_eq!(config.sprint.done_status, "Done");
        assert!(!config.report.highlight_selected);
        assert_eq!(config.data.input, Some(PathBuf::from("tasks.csv")));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[data]"));
        assert!(toml_str.contains("[sprint]"));
        assert!(toml_str.contains("length_days = 14"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.sprint.done_status, "Done");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[sprint]\nlength_days = 10\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sprint.length_days, 10);
    }

    #[test]
    fn test_load_invalid_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[sprint\nlength_days = ").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_log_level_honors_config_verbose() {
        let mut config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);

        config.general.verbose = false;
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        let mut args = make_args();
        args.verbose = true;
        config.merge_with_args(&args);
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
    }
}
