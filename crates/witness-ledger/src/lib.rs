//! Append-only incident store for the Witness incident-identity engine.
//!
//! Incidents are the only source of truth. Everything else an entity "is"
//! gets recomputed from the incidents that name it as a participant.
//!
//! # Architecture
//!
//! - [`store`] -- The [`IncidentStore`]: validated append, operation
//!   requests, replay from a journal.
//! - [`view`] -- [`LedgerView`], a consistent point-in-time read of the store
//!   with lazy chronological queries.
//! - [`identity`] -- [`EntityIdentity`], an entity's identity derived on
//!   every call.
//! - [`builder`] -- The [`IncidentBuilder`] for assembling incidents.
//!
//! # Append-only
//!
//! There is no method that modifies or removes a committed incident.
//! Requests that would do so arrive as [`StoreOperation`]s, go through the
//! append-only rule and come back as [`LedgerError::UnsupportedOperation`].
//! The store never panics; it returns errors.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::{TimeZone, Utc};
//! use witness_ledger::{IncidentBuilder, IncidentStore};
//! use witness_validator::{Validator, ValidatorConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = Arc::new(Validator::new(ValidatorConfig::default())?);
//! let store = IncidentStore::new(validator);
//!
//! let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().ok_or("bad date")?;
//! let incident = IncidentBuilder::new("incident_001", "mail")
//!     .date(date)
//!     .participants(["a", "b"])
//!     .fact("a sent a letter to b")
//!     .build()?;
//!
//! store.append(incident)?;
//! assert_eq!(store.len()?, 1);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod identity;
pub mod store;
pub mod view;

// Re-export primary types at crate root.
pub use builder::IncidentBuilder;
pub use identity::EntityIdentity;
pub use store::{IncidentStore, StoreOperation};
pub use view::LedgerView;

use witness_types::{IncidentId, JournalRecord, OperationKind, OperationTarget, ValidationReport};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when writing to or reading from the store.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The incident failed one or more validation layers.
    #[error("incident rejected: {0}")]
    Validation(ValidationReport),

    /// An incident with this id is already committed.
    #[error("incident {0} already exists")]
    DuplicateId(IncidentId),

    /// The requested operation would alter committed history.
    #[error("{operation} is not supported on {target}")]
    UnsupportedOperation {
        /// What was requested.
        operation: OperationKind,
        /// Where it was requested.
        target: OperationTarget,
    },

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The journal refused the record; the store is unchanged.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// A lock was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

// ---------------------------------------------------------------------------
// Journal seam
// ---------------------------------------------------------------------------

/// Errors raised by a [`Journal`].
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// Reading or writing the backing medium failed.
    #[error("journal I/O failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A record could not be encoded or decoded.
    #[error("journal record serialization failed: {source}")]
    Serialization {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The journal's own lock was poisoned.
    #[error("journal lock poisoned")]
    LockPoisoned,
}

/// Durable sink for committed records.
///
/// The store and overlay hand every accepted record to the journal before
/// making it visible. A journal only ever appends.
pub trait Journal: Send + Sync {
    /// Persist one record.
    fn append(&self, record: &JournalRecord) -> Result<(), JournalError>;
}
