//! Rebuilding store and overlay state from journal records.
//!
//! Records go back through the same validation as live writes, in journal
//! order, but are not journaled a second time. The first refusal stops the
//! replay: a journal the validator no longer accepts needs an operator, not
//! a silent skip.

use serde::Serialize;
use tracing::info;

use witness_ledger::IncidentStore;
use witness_meaning::MeaningOverlay;
use witness_types::JournalRecord;

use crate::error::DbError;

/// Counts of replayed records by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    /// Incidents re-appended.
    pub incidents: usize,
    /// Meaning entries re-stored.
    pub meanings: usize,
    /// Annotation links re-created.
    pub annotations: usize,
}

/// Replay `records` into `store` and `overlay`.
pub fn restore(
    records: impl IntoIterator<Item = JournalRecord>,
    store: &IncidentStore,
    overlay: &MeaningOverlay,
) -> Result<ReplayStats, DbError> {
    let mut stats = ReplayStats::default();
    for record in records {
        match record {
            JournalRecord::Incident(incident) => {
                store.replay(incident)?;
                stats.incidents = stats.incidents.saturating_add(1);
            }
            JournalRecord::Meaning(entry) => {
                overlay.replay_meaning(entry)?;
                stats.meanings = stats.meanings.saturating_add(1);
            }
            JournalRecord::Annotation(annotation) => {
                overlay.replay_annotation(annotation)?;
                stats.annotations = stats.annotations.saturating_add(1);
            }
        }
    }
    info!(
        incidents = stats.incidents,
        meanings = stats.meanings,
        annotations = stats.annotations,
        "Journal replayed"
    );
    Ok(stats)
}
