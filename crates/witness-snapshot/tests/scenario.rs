//! End-to-end walk through store, overlay and snapshots.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use witness_ledger::{IncidentBuilder, IncidentStore, LedgerError, StoreOperation};
use witness_meaning::MeaningOverlay;
use witness_snapshot::SnapshotGenerator;
use witness_types::{
    EntityId, Incident, IncidentId, IncidentType, MeaningEntry, MeaningSource, OperationKind,
    SnapshotBody,
};
use witness_validator::{Validator, ValidatorConfig};

struct Engine {
    store: Arc<IncidentStore>,
    overlay: Arc<MeaningOverlay>,
    snapshots: SnapshotGenerator,
}

fn engine() -> Engine {
    let validator = Arc::new(Validator::new(ValidatorConfig::default()).unwrap());
    let store = Arc::new(IncidentStore::new(Arc::clone(&validator)));
    let overlay = Arc::new(MeaningOverlay::new(Arc::clone(&store), validator, None));
    let snapshots = SnapshotGenerator::new(Arc::clone(&store), Arc::clone(&overlay));
    Engine {
        store,
        overlay,
        snapshots,
    }
}

fn incident_001() -> Incident {
    IncidentBuilder::new("incident_001", "mail")
        .date(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        .incident_type(IncidentType::Communication)
        .participants(["a", "b"])
        .fact("a sent a letter to b")
        .fact("b received the letter")
        .summary("a letter passed from a to b")
        .outcome("the letter was delivered")
        .build()
        .unwrap()
}

fn serialized(store: &IncidentStore) -> String {
    let all = store.get_all().unwrap();
    let plain: Vec<&Incident> = all.iter().map(AsRef::as_ref).collect();
    serde_json::to_string(&plain).unwrap()
}

#[test]
fn full_scenario() {
    let engine = engine();
    engine.store.append(incident_001()).unwrap();

    let communication = MeaningEntry::new(
        "communication",
        MeaningSource::Etymology,
        "from Latin communicare, to share or make common",
    )
    .with_examples(["letters are one form of communication"]);
    engine.overlay.add_meaning(communication.clone()).unwrap();
    engine
        .overlay
        .annotate_incident("incident_001", "letter", communication)
        .unwrap();

    let first = engine.snapshots.create_identity_snapshot("a").unwrap();
    let SnapshotBody::Identity(identity) = &first.body else {
        panic!("expected an identity body");
    };
    assert_eq!(identity.incident_count, 1);
    assert_eq!(identity.systems.len(), 1);
    assert!(identity.systems.contains("mail"));
    assert_eq!(identity.co_participants.iter().collect::<Vec<_>>(), vec![&EntityId::new("b")]);
    assert_eq!(identity.meanings.len(), 1);
    assert!(!first.authoritative);

    let before = serialized(&engine.store);
    let refused = engine.store.execute(StoreOperation::Modify {
        incident_id: IncidentId::new("incident_001"),
        field: "outcome".to_owned(),
        value: json!("the letter was lost"),
    });
    assert!(matches!(
        refused,
        Err(LedgerError::UnsupportedOperation {
            operation: OperationKind::Modify,
            ..
        })
    ));
    assert_eq!(serialized(&engine.store), before);
    let stored = engine.store.get(&IncidentId::new("incident_001")).unwrap().unwrap();
    assert_eq!(stored.outcome, "the letter was delivered");

    let again = engine.snapshots.create_identity_snapshot("a").unwrap();
    assert!(first.same_content(&again));
}

#[test]
fn predictive_incident_never_reaches_the_store() {
    let engine = engine();
    let mut tomorrow = incident_001();
    tomorrow.facts = vec!["a and b will meet tomorrow".to_owned()];
    assert!(matches!(
        engine.store.append(tomorrow),
        Err(LedgerError::Validation(_))
    ));

    let mut yesterday = incident_001();
    yesterday.facts = vec!["a and b met yesterday".to_owned()];
    engine.store.append(yesterday).unwrap();
    assert_eq!(engine.store.len().unwrap(), 1);
}

#[test]
fn deleting_snapshots_does_not_touch_state() {
    let engine = engine();
    engine.store.append(incident_001()).unwrap();
    let before = serialized(&engine.store);

    let snapshot = engine.snapshots.create_timeline_snapshot("b").unwrap();
    assert!(engine.snapshots.delete_snapshot(snapshot.snapshot_id).unwrap());
    engine.snapshots.clear().unwrap();

    assert_eq!(serialized(&engine.store), before);
    assert!(engine.overlay.entries().unwrap().is_empty());
}

#[test]
fn snapshot_text_cannot_be_fed_back_as_an_incident() {
    let engine = engine();
    engine.store.append(incident_001()).unwrap();
    let snapshot = engine.snapshots.create_identity_snapshot("a").unwrap();

    let laundered = IncidentBuilder::new("incident_002", "mail")
        .date(Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap())
        .participant("a")
        .fact(snapshot.note.clone())
        .build()
        .unwrap();
    assert!(matches!(
        engine.store.append(laundered),
        Err(LedgerError::Validation(_))
    ));
}
