//! Error types for the persistence layer.

use std::path::PathBuf;

use witness_ledger::LedgerError;
use witness_meaning::MeaningError;

/// Errors that can occur while reading or replaying a journal.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The journal file could not be opened or read.
    #[error("journal I/O error on {path}: {source}")]
    Io {
        /// The journal file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A journal line is not a valid record.
    #[error("journal line {line} is malformed: {source}")]
    Corrupt {
        /// One-based line number.
        line: usize,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A replayed incident was refused by the store.
    #[error("replay refused by the incident store: {0}")]
    Ledger(#[from] LedgerError),

    /// A replayed meaning or annotation was refused by the overlay.
    #[error("replay refused by the meaning overlay: {0}")]
    Meaning(#[from] MeaningError),
}
