// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use cmd::session::{Controls, cycle, run};
use diagnostics::{Level, init_diagnostics, init_with_level};
use statusboard::{Board, BoardConfig, load_config};
use tokio::io::BufReader;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "board")]
/// Operational status board over alert, incident and change feeds
struct Cli {
    /// Board configuration (YAML); the built-in layout when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show only this application ("All" for every application)
    #[arg(long)]
    app: Option<String>,

    /// First day of the date range (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the date range (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Keep only changes with business impact
    #[arg(long)]
    impact: bool,

    /// Render once and exit instead of reading commands from stdin
    #[arg(long)]
    once: bool,

    /// Debug logging, regardless of STATUSBOARD_LOG
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        init_with_level(Some(Level::Debug));
    } else {
        init_diagnostics();
    }

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => BoardConfig::standard().context("Built-in configuration is invalid")?,
    };

    let board = Board::with_http(config)?;
    let controls = Controls::new(cli.app, cli.from, cli.to, cli.impact);
    let mut stdout = io::stdout().lock();

    if cli.once {
        let mut session = board.new_session();
        return cycle(&board, &mut session, &controls, None, &mut stdout).await;
    }

    run(&board, controls, BufReader::new(tokio::io::stdin()), &mut stdout).await
}
