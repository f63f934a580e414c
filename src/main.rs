//! SprintLens - sprint delivery metrics from a task CSV
//!
//! A CLI tool that loads a flat export of task records and renders the
//! delivery dashboard (velocity, cycle time, defects, throughput, flow)
//! as Markdown or JSON.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, IO, bad arguments, unknown sprint)
//!   2 - Malformed input data

mod analysis;
mod cli;
mod config;
mod dashboard;
mod error;
mod loader;
mod models;
mod report;

use analysis::SprintSettings;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use dashboard::{Dashboard, DashboardOptions, Session, SessionCommand};
use error::DataError;
use loader::{LoadOptions, TaskLoader};
use models::{DashboardReport, Page, ReportMetadata};
use std::io::BufRead;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `general.verbose` applies
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("SprintLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

/// Map a failure to the process exit code.
fn exit_code(e: &anyhow::Error) -> i32 {
    if e.chain().any(|cause| cause.is::<DataError>()) {
        2
    } else {
        1
    }
}

/// Handle --init-config: generate a default .sprintlens.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the input path, sprint length, and done status.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load the table and render the requested output.
fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let input = config
        .data
        .input
        .clone()
        .context("No input given: pass --input or set data.input in .sprintlens.toml")?;
    if !config.data.delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character");
    }

    // Step 1: Load the task table
    let mut load_options = LoadOptions::from(&config.data);
    load_options.show_progress = !args.quiet;

    info!("Loading tasks from {}", input.display());
    let records = TaskLoader::new(load_options)
        .load(&input)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    // Step 2: Assign sprints against one global anchor
    let settings = SprintSettings::from(&config.sprint);
    let table = analysis::assign_sprints(records, &settings).context("Failed to assign sprints")?;
    info!(
        "Loaded {} tasks across {} sprints (anchor {})",
        table.len(),
        table.sprints().len(),
        table.anchor().start()
    );

    let dashboard = Dashboard::new(&table, DashboardOptions::from(&config));

    if args.list_sprints {
        return handle_list_sprints(&dashboard, &config);
    }

    let pages = args.page.pages();
    let first_page = pages.first().copied().unwrap_or(Page::Delivery);
    let session = Session::new(dashboard, first_page, args.sprint)?;

    if args.interactive {
        return run_interactive(session, config.general.format);
    }

    // Step 3: Render the requested pages
    let selected = session.sprint();
    let views = pages
        .iter()
        .map(|page| session.dashboard().render(*page, selected))
        .collect::<Result<Vec<_>, _>>()?;

    let summary = config.report.include_summary.then(|| {
        analysis::summarize_sprint(&table, selected, &config.sprint.done_status)
    });

    let report = DashboardReport {
        metadata: ReportMetadata {
            input: input.clone(),
            generated_at: Utc::now(),
            rows: table.len(),
            anchor_date: table.anchor().start(),
            sprint_length_days: table.anchor().length_days(),
            sprint_count: table.sprints().len(),
            selected_sprint: selected,
        },
        summary,
        pages: views,
    };

    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    report::write_output(&output, &config.general.output)?;

    if config.general.output != "-" && !args.quiet {
        println!(
            "📊 {} tasks, {} sprints, sprint {} selected",
            report.metadata.rows, report.metadata.sprint_count, selected
        );
        println!(
            "✅ Report saved to: {} ({:.2}s)",
            config.general.output,
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

/// Handle --list-sprints: print the sprint selector and exit.
fn handle_list_sprints(dashboard: &Dashboard<'_>, config: &Config) -> Result<()> {
    let anchor = dashboard.table().anchor();
    let done = config.sprint.done_status.as_str();

    println!("Sprints ({}-day, starting {}):", anchor.length_days(), anchor.start());
    for sprint in dashboard.sprint_options() {
        let summary = analysis::summarize_sprint(dashboard.table(), sprint, done);
        println!(
            "  Sprint {:>3}  from {}  {:>4} tasks  {:>4} done  {:>6} points",
            sprint,
            anchor.sprint_start(sprint),
            summary.tasks,
            summary.tasks_done,
            summary.points_completed
        );
    }
    Ok(())
}

/// Handle --interactive: apply commands from stdin and re-render.
fn run_interactive(mut session: Session<'_>, format: OutputFormat) -> Result<()> {
    let render = |view: &models::PageView| -> Result<String> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(view).map_err(Into::into),
            OutputFormat::Markdown => Ok(report::generate_page_section(view)),
        }
    };

    println!("{}", render(&session.current()?)?);
    println!("{}", dashboard::session::HELP);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match dashboard::parse_command(&line) {
            Ok(SessionCommand::Quit) => break,
            Ok(SessionCommand::Help) => println!("{}", dashboard::session::HELP),
            Ok(SessionCommand::Sprints) => {
                let options: Vec<String> = session
                    .dashboard()
                    .sprint_options()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                println!("Sprints: {}", options.join(", "));
            }
            Ok(SessionCommand::Event(event)) => match session.handle(event) {
                Ok(view) => {
                    println!("[{} | sprint {}]", session.page(), session.sprint());
                    println!("{}", render(&view)?);
                }
                Err(e) => warn!("{}", e),
            },
            Err(e) => warn!("{}", e),
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}", CONFIG_FILE_NAME, e);
            Ok(Config::default())
        }
    }
}
