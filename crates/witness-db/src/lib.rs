//! Persistence for the Witness incident-identity engine.
//!
//! The store and overlay live in memory. Durability comes from a journal:
//! every accepted record is appended to it before it becomes visible, and
//! on start-up the journal is read back and replayed.
//!
//! ```text
//! append / add_meaning / annotate
//!     |
//!     +-- Journal::append(record) --> JsonlJournal (one JSON object per line)
//!
//! start-up
//!     |
//!     +-- read_journal(path) --> Vec<JournalRecord>
//!     +-- restore(records)   --> IncidentStore + MeaningOverlay
//! ```
//!
//! # Modules
//!
//! - [`jsonl`] -- Append-mode JSON-lines journal and reader
//! - [`memory`] -- In-memory journal for tests and dry runs
//! - [`replay`] -- Rebuilding state from journal records
//! - [`error`] -- Shared error types

pub mod error;
pub mod jsonl;
pub mod memory;
pub mod replay;

pub use error::DbError;
pub use jsonl::{JournalSink, JsonlJournal, read_journal};
pub use memory::MemoryJournal;
pub use replay::{ReplayStats, restore};
