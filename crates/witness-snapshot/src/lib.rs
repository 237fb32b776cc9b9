//! Snapshot views for the Witness incident-identity engine.
//!
//! A snapshot is a convenience: a projection of the incident store and the
//! meaning overlay at one moment, stamped non-authoritative, held in a
//! transient cache and safe to throw away. Deleting or clearing snapshots
//! never touches the store or the overlay, and regenerating a snapshot from
//! unchanged state gives the same content.
//!
//! - [`generator`] -- The [`SnapshotGenerator`] and its cache.
//! - [`project`] -- Pure projections from store and overlay views.

pub mod generator;
pub mod project;

pub use generator::SnapshotGenerator;

use witness_ledger::LedgerError;
use witness_meaning::MeaningError;
use witness_types::ValidationReport;

/// Errors that can occur while generating or caching snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The incident store could not be read.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The meaning overlay could not be read.
    #[error(transparent)]
    Meaning(#[from] MeaningError),

    /// A generated view failed the snapshot checks and was not cached.
    #[error("snapshot rejected: {0}")]
    Validation(ValidationReport),

    /// The cache lock was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}
