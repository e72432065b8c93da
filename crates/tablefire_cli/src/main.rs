//! `tablefire` command-line front end.
//!
//! # Responsibility
//! - Parse flags and environment into a [`config::Config`].
//! - Initialize logging, open the store and dispatch one subcommand.

mod commands;
mod config;

use anyhow::{Context as _, Result};
use clap::Parser;
use commands::{App, Command};
use config::{Config, GlobalArgs};
use log::{error, info};
use std::process::ExitCode;
use tablefire_core::{core_version, init_logging, open_db, ChangeFeed};

#[derive(Debug, Parser)]
#[command(name = "tablefire", version, about = "Restaurant floor: orders, kitchen and billing")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_args(&cli.global)?;
    let log_dir = config.log_dir.to_string_lossy().into_owned();
    init_logging(&config.log_level, &log_dir).context("cannot initialize logging")?;
    info!(
        "event=cli_start module=cli status=ok version={} db={}",
        core_version(),
        config.db_path.display()
    );

    let conn = open_db(&config.db_path)
        .with_context(|| format!("cannot open database {}", config.db_path.display()))?;
    let feed = ChangeFeed::new();
    let app = App {
        config: &config,
        conn: &conn,
        feed: &feed,
    };
    commands::run(&app, cli.command)
}
