//! Witness engine binary.
//!
//! Rebuilds the incident store and meaning overlay from the journal, then
//! runs one command against them.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing, to stderr)
//! 2. Parse the command line
//! 3. Load configuration (`witness-config.yaml` unless `--config` says otherwise)
//! 4. Compile the validator and replay the journal
//! 5. Run the command and print its result to stdout

mod commands;
mod config;
mod engine;
mod error;

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::commands::{Cli, Command};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::error::EngineError;

/// Environment variable selecting the log format.
const LOG_FORMAT_ENV: &str = "WITNESS_LOG_FORMAT";

fn main() -> Result<ExitCode, EngineError> {
    // 1. Initialize structured logging.
    init_logging();
    info!("witness-engine starting");

    // 2. Parse the command line.
    let cli = Cli::parse();

    // 3. Load configuration.
    let config = EngineConfig::load(&cli.config)?;
    info!(journal = %config.journal_path.display(), "Configuration loaded");

    // 4. Rebuild state from the journal.
    let engine = Engine::open(&config)?;
    info!(
        incidents = engine.replayed.incidents,
        meanings = engine.replayed.meanings,
        annotations = engine.replayed.annotations,
        "Engine ready"
    );

    // 5. Run the command.
    let command = cli.command.unwrap_or(Command::Audit);
    let passed = match &command {
        Command::Audit => commands::audit(&engine)?,
        Command::Ingest { file } => commands::ingest(&engine, file)?,
        Command::Identity { entity } => commands::identity(&engine, entity)?,
    };

    info!(?command, passed, "witness-engine finished");
    Ok(if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if std::env::var(LOG_FORMAT_ENV).is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}
