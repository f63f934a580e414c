//! Interactive dashboard session.
//!
//! Page buttons and the sprint selector become [`DashboardEvent`]s; each
//! handled event re-renders the current page from the table.

use super::{Dashboard, DashboardError};
use crate::models::{Page, PageView};
use tracing::debug;

/// A user interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    SelectPage(Page),
    SelectSprint(u32),
}

/// A parsed line of interactive input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Event(DashboardEvent),
    Sprints,
    Help,
    Quit,
}

/// Help text for the interactive prompt.
pub const HELP: &str = "Commands:
  page <1|2|3|delivery|throughput|flow>   switch page
  sprint <N>                              select sprint
  sprints                                 list sprints
  help                                    show this help
  quit                                    exit";

/// Parse one line of interactive input.
pub fn parse_command(line: &str) -> Result<SessionCommand, String> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or("").to_lowercase();
    let argument = parts.next();

    match (command.as_str(), argument) {
        ("page" | "p", Some(arg)) => arg
            .parse::<Page>()
            .map(|page| SessionCommand::Event(DashboardEvent::SelectPage(page))),
        ("sprint" | "s", Some(arg)) => arg
            .parse::<u32>()
            .map(|sprint| SessionCommand::Event(DashboardEvent::SelectSprint(sprint)))
            .map_err(|_| format!("Invalid sprint: {}", arg)),
        ("page" | "p" | "sprint" | "s", None) => Err(format!("'{}' needs an argument", command)),
        ("sprints", _) => Ok(SessionCommand::Sprints),
        ("help" | "h" | "?", _) => Ok(SessionCommand::Help),
        ("quit" | "q" | "exit", _) => Ok(SessionCommand::Quit),
        ("", _) => Err("Empty command".to_string()),
        (other, _) => Err(format!("Unknown command: {}", other)),
    }
}

/// Current page and sprint over a dashboard.
#[derive(Debug)]
pub struct Session<'a> {
    dashboard: Dashboard<'a>,
    page: Page,
    sprint: u32,
}

impl<'a> Session<'a> {
    /// Start a session. `sprint` defaults to the dashboard's first sprint.
    pub fn new(
        dashboard: Dashboard<'a>,
        page: Page,
        sprint: Option<u32>,
    ) -> Result<Self, DashboardError> {
        let sprint = dashboard.resolve_sprint(sprint)?;
        Ok(Self {
            dashboard,
            page,
            sprint,
        })
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn sprint(&self) -> u32 {
        self.sprint
    }

    pub fn dashboard(&self) -> &Dashboard<'a> {
        &self.dashboard
    }

    /// Render the current page.
    pub fn current(&self) -> Result<PageView, DashboardError> {
        self.dashboard.render(self.page, self.sprint)
    }

    /// Apply an event and render the resulting page.
    ///
    /// An unknown sprint leaves the session unchanged.
    pub fn handle(&mut self, event: DashboardEvent) -> Result<PageView, DashboardError> {
        debug!("Handling {:?}", event);
        match event {
            DashboardEvent::SelectPage(page) => self.page = page,
            DashboardEvent::SelectSprint(sprint) => {
                self.sprint = self.dashboard.resolve_sprint(Some(sprint))?;
            }
        }
        self.current()
    }
}
