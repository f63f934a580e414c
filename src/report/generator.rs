//! Markdown and JSON report generation.
//!
//! This module renders dashboard pages as Markdown documents, one table
//! per chart, or as pretty-printed JSON.

use crate::models::{Chart, ChartKind, DashboardReport, PageView, ReportMetadata, SprintSummary};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &DashboardReport) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Software Development Metrics Dashboard\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    if report.pages.len() > 1 {
        output.push_str(&generate_table_of_contents(&report.pages));
    }

    if let Some(ref summary) = report.summary {
        output.push_str(&generate_summary_section(summary));
    }

    for page in &report.pages {
        output.push_str(&generate_page_section(page));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Input:** `{}`\n", metadata.input.display()));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Tasks:** {}\n", metadata.rows));
    section.push_str(&format!(
        "- **Sprints:** {} ({}-day, starting {})\n",
        metadata.sprint_count, metadata.sprint_length_days, metadata.anchor_date
    ));
    section.push_str(&format!(
        "- **Selected Sprint:** {}\n",
        metadata.selected_sprint
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(pages: &[PageView]) -> String {
    let mut toc = String::new();

    toc.push_str("## Pages\n\n");
    for page in pages {
        let heading = page.page.to_string();
        toc.push_str(&format!("- [{}](#{})\n", heading, anchor(&heading)));
    }
    toc.push('\n');

    toc
}

/// Generate the selected sprint's summary table.
fn generate_summary_section(summary: &SprintSummary) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Sprint {} Summary\n\n", summary.sprint));
    section.push_str(
        "| Tasks | Done | Points Completed | Defects | Mean Cycle Time (days) | Slippage (h) |\n",
    );
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    let cycle = summary
        .mean_cycle_time_days
        .map(format_value)
        .unwrap_or_else(|| "-".to_string());

    section.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} |\n\n",
        summary.tasks,
        summary.tasks_done,
        format_value(summary.points_completed),
        summary.defects,
        cycle,
        format_value(summary.total_slippage_hours),
    ));

    section
}

/// Generate the Markdown for a single page.
pub fn generate_page_section(page: &PageView) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", page.page));

    let options: Vec<String> = page
        .sprint_options
        .iter()
        .map(|s| {
            if *s == page.selected_sprint {
                format!("**[Sprint {}]**", s)
            } else {
                format!("Sprint {}", s)
            }
        })
        .collect();
    section.push_str(&format!("Sprints: {}\n\n", options.join(" · ")));

    for chart in &page.charts {
        section.push_str(&generate_chart_block(chart));
    }

    section
}

/// Generate a single chart as a Markdown table.
fn generate_chart_block(chart: &Chart) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", chart.title));
    block.push_str(&format!(
        "*{} chart: x = `{}`, y = `{}`",
        chart.kind, chart.x_field, chart.y_field
    ));
    if let Some(ref category) = chart.category_field {
        block.push_str(&format!(", series = `{}`", category));
    }
    block.push_str("*\n\n");

    if chart.points.is_empty() {
        block.push_str("No data for this selection.\n\n");
        return block;
    }

    match chart.category_field {
        Some(ref category) => {
            block.push_str(&format!(
                "| {} | {} | {} |\n",
                chart.x_field, category, chart.y_field
            ));
            block.push_str("|:---|:---|---:|\n");
        }
        None => {
            block.push_str(&format!("| {} | {} |\n", chart.x_field, chart.y_field));
            block.push_str("|:---|---:|\n");
        }
    }

    for point in &chart.points {
        let x = if point.highlighted {
            format!("**{}**", escape_cell(&point.x))
        } else {
            escape_cell(&point.x)
        };

        match chart.category_field {
            Some(_) => block.push_str(&format!(
                "| {} | {} | {} |\n",
                x,
                escape_cell(point.category.as_deref().unwrap_or("")),
                format_value(point.y)
            )),
            None => block.push_str(&format!("| {} | {} |\n", x, format_value(point.y))),
        }
    }

    if chart.kind == ChartKind::Pie {
        block.push_str(&format!("| **Total** | {} |\n", format_value(chart.total())));
    }
    block.push('\n');

    block
}

/// Escape a value for use inside a Markdown table cell.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by SprintLens*\n".to_string()
}

/// GitHub-style heading anchor.
fn anchor(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}

/// Whole numbers without decimals, everything else with two.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &DashboardReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered output to a file, or stdout when the target is `-`.
pub fn write_output(content: &str, target: &str) -> Result<()> {
    if target == "-" {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(content.as_bytes())
            .context("Failed to write report to stdout")?;
        return Ok(());
    }

    let path = Path::new(target);
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    Ok(())
}
