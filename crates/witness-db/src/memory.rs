//! In-memory journal.

use std::sync::Mutex;

use witness_ledger::{Journal, JournalError};
use witness_types::JournalRecord;

/// Journal that keeps records in memory. Useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    records: Mutex<Vec<JournalRecord>>,
}

impl MemoryJournal {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record appended so far, in order.
    pub fn records(&self) -> Result<Vec<JournalRecord>, JournalError> {
        let Ok(records) = self.records.lock() else {
            return Err(JournalError::LockPoisoned);
        };
        Ok(records.clone())
    }
}

impl Journal for MemoryJournal {
    fn append(&self, record: &JournalRecord) -> Result<(), JournalError> {
        let Ok(mut records) = self.records.lock() else {
            return Err(JournalError::LockPoisoned);
        };
        records.push(record.clone());
        Ok(())
    }
}
