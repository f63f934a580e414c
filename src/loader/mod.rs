//! CSV loader for task exports.
//!
//! Reads a single CSV file or every `*.csv` file under a directory into
//! [`TaskRecord`]s. Headers are matched loosely so exports from different
//! tools (`Task_ID`, `task id`, `TASK-ID`) load without remapping. The
//! first malformed row aborts the load.

use crate::config::DataConfig;
use crate::error::DataError;
use crate::models::{RecordSource, TaskRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Timestamp layouts accepted in addition to the configured date formats.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Options controlling how CSV input is parsed.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// chrono formats for date-only cells, tried in order.
    pub date_formats: Vec<String>,
    pub delimiter: u8,
    /// Show a progress bar when loading several files.
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::from(&DataConfig::default())
    }
}

impl From<&DataConfig> for LoadOptions {
    fn from(config: &DataConfig) -> Self {
        Self {
            date_formats: config.date_formats.clone(),
            delimiter: u8::try_from(config.delimiter).unwrap_or(b','),
            show_progress: false,
        }
    }
}

/// Input columns, in the order they appear in a canonical export.
/// The discriminant doubles as the slot in [`ColumnMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    TaskId,
    Date,
    StartDate,
    EndDate,
    Status,
    StoryPoints,
    DefectsReported,
    EstimatedHours,
    ActualHours,
    TaskType,
    Resource,
}

impl Column {
    const ALL: [Column; 11] = [
        Column::TaskId,
        Column::Date,
        Column::StartDate,
        Column::EndDate,
        Column::Status,
        Column::StoryPoints,
        Column::DefectsReported,
        Column::EstimatedHours,
        Column::ActualHours,
        Column::TaskType,
        Column::Resource,
    ];

    /// Header name as written by the canonical export.
    fn header(&self) -> &'static str {
        match self {
            Column::TaskId => "Task_ID",
            Column::Date => "Date",
            Column::StartDate => "Start_Date",
            Column::EndDate => "End_Date",
            Column::Status => "Status",
            Column::StoryPoints => "Story_Points",
            Column::DefectsReported => "Defects_Reported",
            Column::EstimatedHours => "Estimated_Hours",
            Column::ActualHours => "Actual_Hours",
            Column::TaskType => "Task_Type",
            Column::Resource => "Resource",
        }
    }
}

/// Normalize a header for comparison: trimmed, lowercase, `_` separators.
fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// Position of every required column in a header row.
#[derive(Debug)]
struct ColumnMap {
    indices: [usize; Column::ALL.len()],
}

impl ColumnMap {
    fn resolve(headers: &StringRecord, source: &Path) -> Result<Self, DataError> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut indices = [0usize; Column::ALL.len()];

        for (slot, column) in Column::ALL.iter().enumerate() {
            let wanted = normalize_header(column.header());
            indices[slot] = normalized
                .iter()
                .position(|h| *h == wanted)
                .ok_or_else(|| DataError::MissingColumn {
                    column: column.header().to_string(),
                    path: source.to_path_buf(),
                })?;
        }

        Ok(Self { indices })
    }

    fn get<'r>(&self, record: &'r StringRecord, column: Column) -> &'r str {
        record.get(self.indices[column as usize]).unwrap_or("")
    }
}

/// Loads task records from CSV.
pub struct TaskLoader {
    options: LoadOptions,
}

impl TaskLoader {
    /// Create a new loader.
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load a CSV file, or every CSV file under a directory.
    pub fn load(&self, path: &Path) -> Result<Vec<TaskRecord>, DataError> {
        if !path.exists() {
            return Err(DataError::InputNotFound(path.to_path_buf()));
        }

        if !path.is_dir() {
            return self.load_file(path);
        }

        let files = csv_files(path);
        if files.is_empty() {
            return Err(DataError::NoCsvFiles(path.to_path_buf()));
        }
        info!("Loading {} CSV files from {}", files.len(), path.display());

        let progress = if self.options.show_progress && files.len() > 1 {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(PROGRESS_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut records = Vec::new();
        for file in &files {
            if let Some(ref pb) = progress {
                pb.set_message(file.display().to_string());
            }
            let loaded = self.load_file(file).map_err(|e| e.in_file(file))?;
            records.extend(loaded);
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_with_message("Load complete");
        }

        Ok(records)
    }

    /// Load a single CSV file.
    pub fn load_file(&self, path: &Path) -> Result<Vec<TaskRecord>, DataError> {
        let file = std::fs::File::open(path)?;
        let records = self.read_from(file, path)?;
        debug!("Read {} rows from {}", records.len(), path.display());
        Ok(records)
    }

    /// Parse CSV from any reader. `source` is only used in error messages.
    pub fn read_from<R: Read>(
        &self,
        reader: R,
        source: &Path,
    ) -> Result<Vec<TaskRecord>, DataError> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| DataError::csv(source, e))?
            .clone();
        let columns = ColumnMap::resolve(&headers, source)?;

        let mut records = Vec::new();
        for (idx, result) in csv_reader.records().enumerate() {
            let row = result.map_err(|e| DataError::csv(source, e))?;
            let mut record = self.parse_row(&row, &columns, idx + 1)?;
            record.source = Some(RecordSource {
                path: source.to_path_buf(),
                row: idx + 1,
            });
            records.push(record);
        }

        Ok(records)
    }

    fn parse_row(
        &self,
        row: &StringRecord,
        columns: &ColumnMap,
        row_number: usize,
    ) -> Result<TaskRecord, DataError> {
        let date = |column: Column| {
            parse_date(columns.get(row, column), &self.options.date_formats).ok_or_else(|| {
                DataError::InvalidDate {
                    row: row_number,
                    column: column.header().to_string(),
                    value: columns.get(row, column).to_string(),
                }
            })
        };
        let number = |column: Column| parse_amount(columns.get(row, column), column, row_number);

        Ok(TaskRecord {
            task_id: columns.get(row, Column::TaskId).to_string(),
            date: date(Column::Date)?,
            start_date: date(Column::StartDate)?,
            end_date: date(Column::EndDate)?,
            status: columns.get(row, Column::Status).to_string(),
            story_points: number(Column::StoryPoints)?,
            defects_reported: parse_count(
                columns.get(row, Column::DefectsReported),
                Column::DefectsReported,
                row_number,
            )?,
            estimated_hours: number(Column::EstimatedHours)?,
            actual_hours: number(Column::ActualHours)?,
            task_type: columns.get(row, Column::TaskType).to_string(),
            resource: columns.get(row, Column::Resource).to_string(),
            source: None,
        })
    }
}

/// CSV files under `dir`, sorted by path. Hidden entries are skipped.
fn csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();

    files.sort();
    files
}

/// Parse a date cell. Timestamps keep only their date part.
pub fn parse_date(value: &str, formats: &[String]) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }

    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parse a non-negative decimal cell.
fn parse_amount(value: &str, column: Column, row: usize) -> Result<f64, DataError> {
    let parsed: f64 = value
        .parse()
        .ok()
        .filter(|n: &f64| n.is_finite())
        .ok_or_else(|| DataError::InvalidNumber {
            row,
            column: column.header().to_string(),
            value: value.to_string(),
        })?;

    if parsed < 0.0 {
        return Err(DataError::NegativeValue {
            row,
            column: column.header().to_string(),
            value: parsed,
        });
    }

    Ok(parsed)
}

/// Parse a non-negative whole-number cell. `3.0` is accepted as 3.
fn parse_count(value: &str, column: Column, row: usize) -> Result<u64, DataError> {
    if let Ok(count) = value.parse::<u64>() {
        return Ok(count);
    }

    let amount = parse_amount(value, column, row)?;
    if amount.fract() != 0.0 || amount >= u64::MAX as f64 {
        return Err(DataError::InvalidNumber {
            row,
            column: column.header().to_string(),
            value: value.to_string(),
        });
    }

    Ok(amount as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    const HEADER: &str = concat!(
        "Task_ID,Date,Start_Date,End_Date,Status,Story_Points,",
        "Defects_Reported,Estimated_Hours,Actual_Hours,Task_Type,Resource"
    );

    fn read(csv: &str) -> Result<Vec<TaskRecord>, DataError> {
        TaskLoader::new(LoadOptions::default())
            .read_from(Cursor::new(csv.to_string()), Path::new("test.csv"))
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_reads_canonical_export() {
        let csv = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,5,1,8,10.5,Feature,alice\nT2,2024-01-15,2024-01-14,2024-01-20,In Progress,3,0,4,2,Bug,bob\n",
            HEADER
        );
        let records = read(&csv).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].task_id, "T1");
        assert_eq!(records[0].date, ymd(2024, 1, 1));
        assert_eq!(records[0].end_date, ymd(2024, 1, 5));
        assert_eq!(records[0].story_points, 5.0);
        assert_eq!(records[0].actual_hours, 10.5);
        assert_eq!(records[1].status, "In Progress");
        assert_eq!(records[1].resource, "bob");
    }

    #[test]
    fn test_headers_are_matched_loosely_and_reordered() {
        let csv = "resource,task type,ACTUAL-HOURS,estimated hours,defects reported,story points,status,end date,start date,date,task id\n\
                   carol,Chore,3,2,0,1,Done,2024-02-03,2024-02-01,2024-02-01,X9\n";
        let records = read(csv).unwrap();

        assert_eq!(records[0].task_id, "X9");
        assert_eq!(records[0].resource, "carol");
        assert_eq!(records[0].actual_hours, 3.0);
        assert_eq!(records[0].start_date, ymd(2024, 2, 1));
    }

    #[test]
    fn test_missing_column_is_reported() {
        let csv = "Task_ID,Date,Start_Date,End_Date,Status,Story_Points,Estimated_Hours,Actual_Hours,Task_Type,Resource\n";
        match read(csv) {
            Err(DataError::MissingColumn { column, .. }) => assert_eq!(column, "Defects_Reported"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_aborts_load() {
        let csv = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,5,1,8,10,Feature,alice\nT2,not-a-date,2024-01-01,2024-01-05,Done,5,1,8,10,Feature,alice\n",
            HEADER
        );
        match read(&csv) {
            Err(DataError::InvalidDate { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "Date");
                assert_eq!(value, "not-a-date");
            }
            other => panic!("expected InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_and_negative_numbers() {
        let bad = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,five,1,8,10,Feature,alice\n",
            HEADER
        );
        assert!(matches!(read(&bad), Err(DataError::InvalidNumber { .. })));

        let negative = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,5,1,-8,10,Feature,alice\n",
            HEADER
        );
        assert!(matches!(read(&negative), Err(DataError::NegativeValue { .. })));

        let fractional_defects = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,5,1.5,8,10,Feature,alice\n",
            HEADER
        );
        assert!(matches!(
            read(&fractional_defects),
            Err(DataError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_whole_float_defect_count_accepted() {
        let csv = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,5,2.0,8,10,Feature,alice\n",
            HEADER
        );
        assert_eq!(read(&csv).unwrap()[0].defects_reported, 2);
    }

    #[test]
    fn test_huge_defect_count_rejected() {
        let csv = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,5,1e30,8,10,Feature,alice\n",
            HEADER
        );
        match read(&csv) {
            Err(DataError::InvalidNumber { column, value, .. }) => {
                assert_eq!(column, "Defects_Reported");
                assert_eq!(value, "1e30");
            }
            other => panic!("expected InvalidNumber, got {:?}", other),
        }
    }

    #[test]
    fn test_records_remember_their_row() {
        let csv = format!(
            "{}\nT1,2024-01-01,2024-01-01,2024-01-05,Done,5,1,8,10,Feature,alice\nT2,2024-01-02,2024-01-02,2024-01-05,Done,5,1,8,10,Feature,alice\n",
            HEADER
        );
        let records = read(&csv).unwrap();
        assert_eq!(
            records[1].source,
            Some(RecordSource {
                path: PathBuf::from("test.csv"),
                row: 2,
            })
        );
    }

    #[test]
    fn test_parse_date_formats() {
        let formats = DataConfig::default().date_formats;
        assert_eq!(parse_date("2024-03-05", &formats), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024/03/05", &formats), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("03/05/2024", &formats), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05 17:45:00", &formats), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T23:10:00+02:00", &formats), Some(ymd(2024, 3, 5)));
        assert_eq!(parse_date("", &formats), None);
        assert_eq!(parse_date("March 5th", &formats), None);
    }

    #[test]
    fn test_load_directory_concatenates_sorted_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("b.csv"),
            format!("{}\nT2,2024-01-15,2024-01-15,2024-01-16,Done,2,0,1,1,Bug,bob\n", HEADER),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            format!("{}\nT1,2024-01-01,2024-01-01,2024-01-02,Done,1,0,1,1,Bug,bob\n", HEADER),
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records = TaskLoader::new(LoadOptions::default()).load(dir.path()).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
    }

    #[test]
    fn test_directory_error_names_failing_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.csv"),
            format!("{}\nT1,2024-01-01,2024-01-01,2024-01-02,Done,1,0,1,1,Bug,bob\n", HEADER),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.csv"),
            format!("{}\nT2,bad,2024-01-15,2024-01-16,Done,2,0,1,1,Bug,bob\n", HEADER),
        )
        .unwrap();

        let err = TaskLoader::new(LoadOptions::default())
            .load(dir.path())
            .unwrap_err();
        match err {
            DataError::InFile { ref path, ref source } => {
                assert!(path.ends_with("b.csv"));
                assert!(matches!(**source, DataError::InvalidDate { row: 1, .. }));
            }
            ref other => panic!("expected InFile, got {:?}", other),
        }

        let message = format!("{:#}", anyhow::Error::new(err));
        assert!(message.contains("b.csv"));
        assert!(message.contains("invalid date 'bad'"));
    }

    #[test]
    fn test_load_empty_directory_errors() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            TaskLoader::new(LoadOptions::default()).load(dir.path()),
            Err(DataError::NoCsvFiles(_))
        ));
    }

    #[test]
    fn test_load_missing_path_errors() {
        assert!(matches!(
            TaskLoader::new(LoadOptions::default()).load(Path::new("/no/such/tasks.csv")),
            Err(DataError::InputNotFound(_))
        ));
    }

    #[test]
    fn test_custom_delimiter() {
        let options = LoadOptions {
            delimiter: b';',
            ..LoadOptions::default()
        };
        let csv = format!(
            "{}\nT1;2024-01-01;2024-01-01;2024-01-05;Done;5;1;8;10;Feature;alice\n",
            HEADER.replace(',', ";")
        );
        let records = TaskLoader::new(options)
            .read_from(Cursor::new(csv), Path::new("semi.csv"))
            .unwrap();
        assert_eq!(records[0].story_points, 5.0);
    }
}
