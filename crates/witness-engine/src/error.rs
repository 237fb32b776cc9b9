//! Error types for the engine binary.

use std::path::PathBuf;

/// Top-level error for the engine binary.
///
/// Each variant wraps one subsystem's error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or rule compilation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: witness_validator::ConfigError,
    },

    /// The journal could not be opened, read or replayed.
    #[error("journal error: {source}")]
    Db {
        /// The underlying persistence error.
        #[from]
        source: witness_db::DbError,
    },

    /// The incident store refused a request.
    #[error("store error: {source}")]
    Ledger {
        /// The underlying store error.
        #[from]
        source: witness_ledger::LedgerError,
    },

    /// The meaning overlay could not be read.
    #[error("overlay error: {source}")]
    Meaning {
        /// The underlying overlay error.
        #[from]
        source: witness_meaning::MeaningError,
    },

    /// Snapshot generation failed.
    #[error("snapshot error: {source}")]
    Snapshot {
        /// The underlying snapshot error.
        #[from]
        source: witness_snapshot::SnapshotError,
    },

    /// An input file could not be read.
    #[error("cannot read {path}: {source}")]
    Input {
        /// The file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A result could not be written to stdout.
    #[error("output error: {source}")]
    Output {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
