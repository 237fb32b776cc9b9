//! Property tests for the append-only store and derived identity.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::assertions_on_constants
)]

use std::sync::Arc;

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

use witness_ledger::{IncidentBuilder, IncidentStore, LedgerError};
use witness_types::Incident;
use witness_validator::{Validator, ValidatorConfig};

const ENTITIES: [&str; 4] = ["a", "b", "c", "d"];
const SYSTEMS: [&str; 3] = ["mail", "radio", "ledger"];
const FACTS: [&str; 4] = [
    "a letter arrived",
    "the gate opened",
    "they will meet again",
    "the bell rang",
];

fn store() -> IncidentStore {
    IncidentStore::new(Arc::new(Validator::new(ValidatorConfig::default()).unwrap()))
}

/// One generated submission: id number, day offset, system, participants, fact.
type Submission = (u8, i64, usize, Vec<usize>, usize);

fn submission() -> impl Strategy<Value = Submission> {
    (
        0u8..20,
        0i64..30,
        0usize..SYSTEMS.len(),
        prop::collection::vec(0usize..ENTITIES.len(), 1..4),
        0usize..FACTS.len(),
    )
}

fn build((id, day, system, who, fact): &Submission) -> Incident {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    IncidentBuilder::new(format!("incident_{id:03}"), SYSTEMS[*system])
        .date(base.checked_add_signed(TimeDelta::days(*day)).unwrap())
        .participants(who.iter().map(|i| ENTITIES[*i]))
        .fact(FACTS[*fact])
        .build()
        .unwrap()
}

proptest! {
    // Whatever is submitted, committed history only ever grows and never
    // changes underneath.
    #[test]
    fn prop_history_is_an_ever_growing_prefix(subs in prop::collection::vec(submission(), 1..40)) {
        let store = store();
        let mut previous = store.get_all().unwrap();
        for sub in &subs {
            let result = store.append(build(sub));
            let current = store.get_all().unwrap();
            match result {
                Ok(_) => prop_assert_eq!(current.len(), previous.len() + 1),
                Err(LedgerError::DuplicateId(_) | LedgerError::Validation(_)) => {
                    prop_assert_eq!(current.len(), previous.len());
                }
                Err(other) => prop_assert!(false, "unexpected error: {other}"),
            }
            prop_assert_eq!(&current[..previous.len()], &previous[..]);
            previous = current;
        }
    }

    // Chronological queries are sorted by date and hold exactly the
    // matching incidents.
    #[test]
    fn prop_queries_are_chronological(subs in prop::collection::vec(submission(), 1..40)) {
        let store = store();
        for sub in &subs {
            let _ = store.append(build(sub));
        }
        let view = store.view().unwrap();
        for entity in ENTITIES {
            let found: Vec<_> = view.by_entity(entity).collect();
            prop_assert!(found.windows(2).all(|w| w[0].date <= w[1].date));
            let expected = view.all().filter(|i| i.involves(entity)).count();
            prop_assert_eq!(found.len(), expected);
        }
        for system in SYSTEMS {
            let found: Vec<_> = view.by_system(system).collect();
            prop_assert!(found.windows(2).all(|w| w[0].date <= w[1].date));
            prop_assert!(found.iter().all(|i| i.system == system));
        }
    }

    // Identity is a pure function of the store: recomputing it gives the
    // same answer, and it agrees with a direct scan.
    #[test]
    fn prop_identity_is_derived(subs in prop::collection::vec(submission(), 1..40)) {
        let store = store();
        for sub in &subs {
            let _ = store.append(build(sub));
        }
        for entity in ENTITIES {
            let identity = store.identity(entity);
            let first = identity.summary().unwrap();
            prop_assert_eq!(&first, &identity.summary().unwrap());

            let all = store.get_all().unwrap();
            let mine: Vec<_> = all.iter().filter(|i| i.involves(entity)).collect();
            prop_assert_eq!(first.incident_count, mine.len());
            prop_assert_eq!(first.first_seen, mine.iter().map(|i| i.date).min());
            prop_assert_eq!(first.last_seen, mine.iter().map(|i| i.date).max());
            prop_assert!(!first.co_participants.iter().any(|p| p.as_str() == entity));
        }
    }
}
