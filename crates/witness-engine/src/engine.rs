//! Wiring of validator, journal, store, overlay and snapshot generator.

use std::sync::Arc;

use tracing::info;

use witness_db::{JsonlJournal, ReplayStats, read_journal, restore};
use witness_ledger::{IncidentStore, Journal};
use witness_meaning::MeaningOverlay;
use witness_snapshot::SnapshotGenerator;
use witness_types::{Incident, JournalRecord};
use witness_validator::Validator;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// A running engine rebuilt from its journal.
#[derive(Debug)]
pub struct Engine {
    /// Shared rule pipeline.
    pub validator: Arc<Validator>,
    /// Authoritative incident store.
    pub store: Arc<IncidentStore>,
    /// Meaning side table.
    pub overlay: Arc<MeaningOverlay>,
    /// Snapshot views over store and overlay.
    pub snapshots: SnapshotGenerator,
    /// Incidents as read back from the journal at start-up.
    pub baseline: Vec<Incident>,
    /// What the replay restored.
    pub replayed: ReplayStats,
}

impl Engine {
    /// Compile the rules, replay the journal and open it for new records.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        let validator = Arc::new(Validator::new(config.validator.clone())?);
        info!(layers = ?validator.layers().collect::<Vec<_>>(), "Validator ready");

        let records = read_journal(&config.journal_path)?;
        let baseline = records
            .iter()
            .filter_map(|r| match r {
                JournalRecord::Incident(incident) => Some(incident.clone()),
                JournalRecord::Meaning(_) | JournalRecord::Annotation(_) => None,
            })
            .collect();

        let journal: Arc<dyn Journal> = Arc::new(JsonlJournal::open(&config.journal_path)?);
        let store = Arc::new(IncidentStore::with_journal(
            Arc::clone(&validator),
            Arc::clone(&journal),
        ));
        let overlay = Arc::new(MeaningOverlay::new(
            Arc::clone(&store),
            Arc::clone(&validator),
            Some(journal),
        ));
        let replayed = restore(records, &store, &overlay)?;
        let snapshots = SnapshotGenerator::new(Arc::clone(&store), Arc::clone(&overlay));

        Ok(Self {
            validator,
            store,
            overlay,
            snapshots,
            baseline,
            replayed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use witness_ledger::IncidentBuilder;
    use witness_types::{MeaningEntry, MeaningSource};

    use super::*;
    use crate::commands;

    fn config(dir: &tempfile::TempDir) -> EngineConfig {
        EngineConfig {
            journal_path: dir.path().join("witness.jsonl"),
            ..EngineConfig::default()
        }
    }

    fn incident(id: &str) -> Incident {
        IncidentBuilder::new(id, "radio")
            .date(Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap())
            .participants(["a", "b"])
            .fact("a called b on the evening channel")
            .build()
            .unwrap()
    }

    #[test]
    fn state_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = Engine::open(&config(&dir)).unwrap();
            engine.store.append(incident("i1")).unwrap();
            let entry = MeaningEntry::new("channel", MeaningSource::Etymology, "from Latin canalis");
            engine.overlay.annotate_incident("i1", "channel", entry).unwrap();
        }

        let engine = Engine::open(&config(&dir)).unwrap();
        assert_eq!(engine.replayed.incidents, 1);
        assert_eq!(engine.replayed.annotations, 1);
        assert_eq!(engine.baseline.len(), 1);
        assert!(commands::audit(&engine).unwrap());
    }

    #[test]
    fn ingest_reports_rejected_lines() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Engine::open(&config(&dir)).unwrap();
        let input = dir.path().join("incidents.jsonl");
        let good = serde_json::to_string(&incident("i1")).unwrap();
        let mut bad = incident("i2");
        bad.facts = vec!["b will call back".to_owned()];
        let bad = serde_json::to_string(&bad).unwrap();
        std::fs::write(&input, format!("{good}\n{bad}\nnot json\n")).unwrap();

        assert!(!commands::ingest(&engine, &input).unwrap());
        assert_eq!(engine.store.len().unwrap(), 1);
    }
}
