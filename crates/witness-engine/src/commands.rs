//! The engine's command line and commands.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use witness_ledger::LedgerError;
use witness_snapshot::SnapshotError;
use witness_types::{Incident, RuleId, Violation};
use witness_validator::{SystemState, log_rejection, parse_incident_document, validate_system_state};

use crate::config::CONFIG_FILE;
use crate::engine::Engine;
use crate::error::EngineError;

const ENVIRONMENT: &str = "\
Environment:
  WITNESS_JOURNAL     journal path (overrides the config file)
  WITNESS_LOG_FORMAT  `json` for JSON log lines
  RUST_LOG            log filter (default `info`)";

/// Rebuild the incident store from its journal and run one command.
#[derive(Debug, Parser)]
#[command(name = "witness-engine", version, about, after_help = ENVIRONMENT)]
pub struct Cli {
    /// Configuration file. Missing means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// What to run. Defaults to `audit`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do once the engine is up.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Audit store, overlay, snapshots and journal, and print the report.
    Audit,
    /// Validate and append incident documents from a JSON-lines file.
    Ingest {
        /// JSON-lines file, one incident document per line.
        file: PathBuf,
    },
    /// Print one entity's identity snapshot.
    Identity {
        /// The entity.
        entity: String,
    },
}

fn print_json(value: &impl Serialize) -> Result<(), EngineError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Run the full audit and print the report. Returns whether it passed.
///
/// An entity whose identity snapshot cannot be generated is reported in
/// the audit rather than ending it.
pub fn audit(engine: &Engine) -> Result<bool, EngineError> {
    let view = engine.store.view()?;
    let mut failures = Vec::new();
    for entity in view.entities() {
        if let Err(e) = engine.snapshots.create_identity_snapshot(entity.as_str()) {
            failures.extend(snapshot_failure(entity.as_str(), e));
        }
    }

    let overlay = engine.overlay.view()?;
    let state = SystemState {
        incidents: view.all().map(|i| i.as_ref().clone()).collect(),
        meanings: overlay.entries().map(|e| e.as_ref().clone()).collect(),
        annotations: overlay.annotations().map(|a| a.as_ref().clone()).collect(),
        snapshots: engine
            .snapshots
            .snapshots()?
            .iter()
            .map(|s| s.as_ref().clone())
            .collect(),
        baseline: Some(engine.baseline.clone()),
    };

    let mut report = validate_system_state(&state, &engine.validator);
    report.extend(failures);
    print_json(&report)?;
    Ok(report.is_valid())
}

/// Violations standing in for a snapshot that could not be generated.
fn snapshot_failure(entity: &str, error: SnapshotError) -> Vec<Violation> {
    let subject = format!("snapshot:identity:{entity}");
    warn!(subject = %subject, error = %error, "Snapshot generation failed during audit");
    match error {
        SnapshotError::Validation(report) => report
            .violations
            .into_iter()
            .map(|v| v.with_subject(subject.clone()))
            .collect(),
        other => vec![
            Violation::new(RuleId::Integrity, "snapshot", other.to_string())
                .with_marker("snapshot_failed")
                .with_subject(subject),
        ],
    }
}

/// Outcome of an ingest run.
#[derive(Debug, Default, Serialize)]
pub struct IngestSummary {
    /// Lines appended.
    pub accepted: usize,
    /// Rejected lines, by one-based line number, with the reason.
    pub rejected: BTreeMap<usize, String>,
}

/// Append every incident document in `path`. Returns whether all were accepted.
pub fn ingest(engine: &Engine, path: &Path) -> Result<bool, EngineError> {
    let input_error = |source| EngineError::Input {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::open(path).map_err(input_error)?;

    let mut summary = IngestSummary::default();
    for (line, text) in (1..).zip(BufReader::new(file).lines()) {
        let text = text.map_err(input_error)?;
        if text.trim().is_empty() {
            continue;
        }
        match ingest_line(engine, &text) {
            Ok(incident) => {
                info!(line, incident_id = %incident.incident_id, "Ingested");
                summary.accepted = summary.accepted.saturating_add(1);
            }
            Err(reason) => {
                warn!(line, reason = %reason, "Line rejected");
                summary.rejected.insert(line, reason);
            }
        }
    }

    print_json(&summary)?;
    Ok(summary.rejected.is_empty())
}

/// A rejected line is reported, not fatal.
fn ingest_line(engine: &Engine, text: &str) -> Result<Arc<Incident>, String> {
    let document: Value = serde_json::from_str(text).map_err(|e| format!("not JSON: {e}"))?;
    let incident = match parse_incident_document(&document) {
        Ok(incident) => incident,
        Err(report) => {
            log_rejection("ingest", &report);
            return Err(report.to_string());
        }
    };
    engine.store.append(incident).map_err(|e| match e {
        LedgerError::Validation(_) | LedgerError::DuplicateId(_) => e.to_string(),
        other => format!("store failure: {other}"),
    })
}

/// Print one entity's identity snapshot.
pub fn identity(engine: &Engine, entity: &str) -> Result<bool, EngineError> {
    let snapshot = engine.snapshots.create_identity_snapshot(entity)?;
    print_json(snapshot.as_ref())?;
    Ok(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use clap::CommandFactory;
    use clap::error::ErrorKind;
    use witness_types::ValidationReport;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("witness-engine").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn audit_is_the_default() {
        assert_eq!(parse(&[]).unwrap().command, None);
        assert_eq!(parse(&["audit"]).unwrap().command, Some(Command::Audit));
        assert_eq!(parse(&[]).unwrap().config, PathBuf::from(CONFIG_FILE));
    }

    #[test]
    fn commands_take_their_argument() {
        assert_eq!(
            parse(&["ingest", "incidents.jsonl"]).unwrap().command,
            Some(Command::Ingest {
                file: PathBuf::from("incidents.jsonl")
            })
        );
        let cli = parse(&["--config", "other.yaml", "identity", "a"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("other.yaml"));
        assert_eq!(
            cli.command,
            Some(Command::Identity {
                entity: "a".to_owned()
            })
        );
    }

    #[test]
    fn bad_command_lines_are_refused() {
        assert_eq!(parse(&["ingest"]).unwrap_err().kind(), ErrorKind::MissingRequiredArgument);
        assert!(parse(&["rewrite"]).is_err());
        assert!(parse(&["audit", "now"]).is_err());
    }

    #[test]
    fn help_is_generated() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(parse(&["help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn rejected_snapshots_become_audit_violations() {
        let mut report = ValidationReport::new();
        report.push(Violation::new(RuleId::Safety, "body.meanings[0].meaning.definition", "prescription marker `should`"));
        let violations = snapshot_failure("a", SnapshotError::Validation(report));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, RuleId::Safety);
        assert_eq!(violations[0].subject.as_deref(), Some("snapshot:identity:a"));

        let violations = snapshot_failure("b", SnapshotError::LockPoisoned("snapshot cache"));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].marker.as_deref(), Some("snapshot_failed"));
    }
}
