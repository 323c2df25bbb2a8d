//! `vitrine` — console front end for the access-control layer.
//!
//! Plays the role of the dashboard UI: restores the session at startup,
//! reports its location, then runs one command against a file-backed store.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use vitrine_auth::{AccessControl, AccessControlConfig, RoleRegistry, SessionRestore};
use vitrine_core::{JsonFileStore, SystemClock};
use vitrine_observability::LogFormat;

mod cli;
mod commands;

use crate::cli::Cli;
use crate::commands::Outcome;

const DEFAULT_STORE_PATH: &str = "vitrine-store.json";

fn main() -> ExitCode {
    let cli = Cli::parse();
    vitrine_observability::init(LogFormat::from_name(&cli.log_format), "info");

    match run(cli) {
        Ok(Outcome::Ok) => ExitCode::SUCCESS,
        Ok(Outcome::Denied) => ExitCode::from(2),
        Err(err) => {
            tracing::error!(error = ?err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let store_path = cli
        .store
        .or_else(|| std::env::var_os("VITRINE_STORE_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
    commands::validate_store_path(&store_path)?;

    let store = JsonFileStore::open(&store_path)
        .with_context(|| format!("failed to open store at {}", store_path.display()))?;

    let mut ac = AccessControl::with_parts(
        store,
        SystemClock,
        RoleRegistry::reference(),
        AccessControlConfig::from_env(),
    );
    ac.set_location(cli.location);

    match ac.load_session() {
        SessionRestore::Expired(redirect) => {
            tracing::info!(message = %redirect.message, "previous session expired");
        }
        SessionRestore::Corrupt => tracing::warn!("discarded unreadable session"),
        SessionRestore::Absent | SessionRestore::Restored(_) => {}
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(&mut ac, cli.command, &mut out)
}
