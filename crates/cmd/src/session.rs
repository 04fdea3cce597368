// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Interactive session: board controls driven by line commands

use crate::render::write_view;
use anyhow::{Result, anyhow, bail};
use chrono::NaiveDate;
use diagnostics::*;
use statusboard::{ALL_APPS, Board, Error, FilterCriteria, FocusState, Session, UserAction};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const HELP: &str = "\
Commands:
  app <name|All>        filter every table by application
  dates <from> <to>     keep rows dated within the range (YYYY-MM-DD)
  dates clear           drop the date range
  impact on|off         toggle the business impact filter
  focus <table>         show one table full screen
  exit                  leave full screen
  refresh               fetch the feeds again
  help                  show this text
  quit                  leave the board";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    App(String),
    Dates(NaiveDate, NaiveDate),
    ClearDates,
    Impact(bool),
    Focus(String),
    Exit,
    Refresh,
    Help,
    Quit,
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| anyhow!("Invalid date '{text}', expected YYYY-MM-DD: {e}"))
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    let Some((word, rest)) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .or_else(|| (!line.is_empty()).then_some((line, "")))
    else {
        return Ok(None);
    };

    let command = match (word.to_ascii_lowercase().as_str(), rest) {
        ("app", "") => bail!("Usage: app <name|All>"),
        ("app", name) => Command::App(name.to_string()),
        ("dates", "clear") => Command::ClearDates,
        ("dates", range) => {
            let dates: Vec<&str> = range.split_whitespace().collect();
            match dates.as_slice() {
                [from, to] => Command::Dates(parse_date(from)?, parse_date(to)?),
                _ => bail!("Usage: dates <from> <to> | dates clear"),
            }
        }
        ("impact", "on") => Command::Impact(true),
        ("impact", "off") => Command::Impact(false),
        ("impact", _) => bail!("Usage: impact on|off"),
        ("focus", "") => bail!("Usage: focus <table>"),
        ("focus", table) => Command::Focus(table.to_string()),
        ("exit", "") => Command::Exit,
        ("refresh", "") => Command::Refresh,
        ("help", "") => Command::Help,
        ("quit", "") => Command::Quit,
        _ => bail!("Unknown command '{line}', try 'help'"),
    };
    Ok(Some(command))
}

impl Command {
    fn changes_filters(&self) -> bool {
        matches!(
            self,
            Command::App(_) | Command::Dates(..) | Command::ClearDates | Command::Impact(_)
        )
    }
}

/// What the session loop does after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Render(Option<UserAction>),
    /// Command refused without touching the controls
    Refused(String),
    Help,
    Quit,
}

/// Filter controls kept between render cycles
#[derive(Debug, Clone, Default)]
pub struct Controls {
    criteria: FilterCriteria,
}

impl Controls {
    #[must_use]
    pub fn new(
        app: Option<String>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        business_impact: bool,
    ) -> Self {
        Self {
            criteria: FilterCriteria {
                app_name: app.unwrap_or_else(|| ALL_APPS.to_string()),
                dates: from.into_iter().chain(to).collect(),
                business_impact,
            },
        }
    }

    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Apply a command. Filter controls are hidden in full screen, so filter
    /// commands are refused until the focused table is exited.
    pub fn apply(&mut self, command: Command, focus: &FocusState) -> Step {
        if let Some(table) = focus.focused_table()
            && command.changes_filters()
        {
            return Step::Refused(format!(
                "Filters are hidden while '{table}' is in full screen, use 'exit' first"
            ));
        }

        match command {
            Command::App(name) => {
                self.criteria.app_name = name;
                Step::Render(None)
            }
            Command::Dates(from, to) => {
                self.criteria.dates = vec![from, to];
                Step::Render(None)
            }
            Command::ClearDates => {
                self.criteria.dates.clear();
                Step::Render(None)
            }
            Command::Impact(on) => {
                self.criteria.business_impact = on;
                Step::Render(None)
            }
            Command::Focus(table) => Step::Render(Some(UserAction::Focus(table))),
            Command::Exit => Step::Render(Some(UserAction::ExitFocus)),
            Command::Refresh => Step::Render(None),
            Command::Help => Step::Help,
            Command::Quit => Step::Quit,
        }
    }
}

/// Run one render cycle and write it out. A rejected focus action is
/// reported and leaves the board as it was.
pub async fn cycle<W: Write>(
    board: &Board,
    session: &mut Session,
    controls: &Controls,
    action: Option<&UserAction>,
    out: &mut W,
) -> Result<()> {
    match board.render(session, controls.criteria(), action).await {
        Ok(view) => write_view(out, &view),
        Err(Error::Focus(e)) => {
            writeln!(out, "{e}")?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Render once, then read commands from `input` until `quit` or end of input
pub async fn run<R, W>(board: &Board, mut controls: Controls, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = board.new_session();
    cycle(board, &mut session, &controls, None, out).await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(out, "{e}")?;
                continue;
            }
        };
        debug!("Session command: {line}", line: line);

        match controls.apply(command, session.focus_state()) {
            Step::Render(action) => {
                cycle(board, &mut session, &controls, action.as_ref(), out).await?;
            }
            Step::Refused(message) => writeln!(out, "{message}")?,
            Step::Help => writeln!(out, "{HELP}")?,
            Step::Quit => break,
        }
        out.flush()?;
    }
    Ok(())
}
