//! Descriptive meaning overlay for the Witness incident-identity engine.
//!
//! The overlay is a side table. It stores meanings for terms and links
//! binding a meaning to an incident or entity, and it never touches the
//! records it describes. Meanings answer "how can this be understood",
//! never "what happens next": every entry and link runs through the same
//! validator as incidents do.
//!
//! # Architecture
//!
//! - [`overlay`] -- The [`MeaningOverlay`]: validated writes under the
//!   store's write gate, operation requests, journal replay.
//! - [`view`] -- [`OverlayView`], a consistent point-in-time read.
//! - [`sources`] -- Entry constructors for the etymology, cultural and
//!   geographic layers.

pub mod overlay;
pub mod sources;
pub mod view;

pub use overlay::{MeaningOperation, MeaningOverlay, OverlayRecord};
pub use view::OverlayView;

use witness_ledger::{JournalError, LedgerError};
use witness_types::{AnnotationId, OperationKind, OperationTarget, ValidationReport};

/// Errors that can occur when writing to or reading from the overlay.
#[derive(Debug, thiserror::Error)]
pub enum MeaningError {
    /// The entry is structurally unusable: empty term or definition, or a
    /// source this deployment does not accept.
    #[error("invalid meaning: {reason}")]
    InvalidMeaning {
        /// Every structural problem found, joined.
        reason: String,
    },

    /// An annotation names a record the store does not hold.
    #[error("unknown {kind} `{id}`")]
    UnknownReference {
        /// `"incident"` or `"entity"`.
        kind: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// A link with this id is already stored.
    #[error("annotation {0} already exists")]
    DuplicateAnnotation(AnnotationId),

    /// The content failed the safety or provenance layers.
    #[error("meaning rejected: {0}")]
    Validation(ValidationReport),

    /// The requested operation would alter stored meanings or links.
    #[error("{operation} is not supported on {target}")]
    UnsupportedOperation {
        /// What was requested.
        operation: OperationKind,
        /// Where it was aimed.
        target: OperationTarget,
    },

    /// The incident store could not be read.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The journal refused the record.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// A lock was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}
