//! Projections from one store view and one overlay view to snapshot bodies.
//!
//! These are pure functions of their inputs: the same views always give
//! the same body.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use witness_ledger::LedgerView;
use witness_meaning::OverlayView;
use witness_types::{
    Annotation, EntityId, IdentitySnapshot, Incident, RelationshipSnapshot, SystemEntitySummary,
    SystemSnapshot, TemporalSnapshot, TimelineEntry, TimelineSnapshot,
};

fn owned<'a>(incidents: impl Iterator<Item = &'a Arc<Incident>>) -> Vec<Incident> {
    incidents.map(|i| i.as_ref().clone()).collect()
}

/// Derived identity of `entity`, with entity links first and then the links
/// on its incidents in date order.
pub fn identity(ledger: &LedgerView, overlay: &OverlayView, entity: &str) -> IdentitySnapshot {
    let summary = ledger.identity(entity);

    let mut meanings: Vec<Annotation> = overlay
        .annotations_for_entity(entity)
        .map(|a| a.as_ref().clone())
        .collect();
    for incident in ledger.by_entity(entity) {
        meanings.extend(
            overlay
                .annotations_for_incident(incident.incident_id.as_str())
                .map(|a| a.as_ref().clone()),
        );
    }

    IdentitySnapshot {
        entity_id: summary.entity_id,
        incident_count: summary.incident_count,
        first_seen: summary.first_seen,
        last_seen: summary.last_seen,
        systems: summary.systems,
        incident_types: summary.incident_types,
        co_participants: summary.co_participants,
        meanings,
    }
}

/// The entity's incidents in date order, each with its links.
pub fn timeline(ledger: &LedgerView, overlay: &OverlayView, entity: &str) -> TimelineSnapshot {
    let entries = ledger
        .by_entity(entity)
        .map(|incident| TimelineEntry {
            incident: incident.as_ref().clone(),
            annotations: overlay
                .annotations_for_incident(incident.incident_id.as_str())
                .map(|a| a.as_ref().clone())
                .collect(),
        })
        .collect();
    TimelineSnapshot {
        entity_id: EntityId::new(entity),
        entries,
    }
}

/// Every incident of `system` plus a per-entity tally.
pub fn system(ledger: &LedgerView, system: &str) -> SystemSnapshot {
    let incidents = owned(ledger.by_system(system));

    let mut entities: BTreeMap<EntityId, SystemEntitySummary> = BTreeMap::new();
    for incident in &incidents {
        for entity in &incident.participants {
            entities
                .entry(entity.clone())
                .and_modify(|s| {
                    s.incident_count = s.incident_count.saturating_add(1);
                    s.first_seen = s.first_seen.min(incident.date);
                    s.last_seen = s.last_seen.max(incident.date);
                })
                .or_insert(SystemEntitySummary {
                    incident_count: 1,
                    first_seen: incident.date,
                    last_seen: incident.date,
                });
        }
    }

    SystemSnapshot {
        system: system.to_owned(),
        incident_count: incidents.len(),
        entities,
        incidents,
    }
}

/// Incidents that include both entities, in date order.
pub fn relationship(ledger: &LedgerView, entity1: &str, entity2: &str) -> RelationshipSnapshot {
    let shared_incidents = owned(ledger.by_entity(entity1).filter(|i| i.involves(entity2)));
    RelationshipSnapshot {
        entity1: EntityId::new(entity1),
        entity2: EntityId::new(entity2),
        interaction_count: shared_incidents.len(),
        shared_incidents,
    }
}

/// Incidents dated within `[start, end]`.
pub fn temporal(ledger: &LedgerView, start: DateTime<Utc>, end: DateTime<Utc>) -> TemporalSnapshot {
    let incidents = owned(ledger.by_date_range(start, end));
    let systems_involved: BTreeSet<String> = incidents.iter().map(|i| i.system.clone()).collect();
    let entities_involved: BTreeSet<EntityId> = incidents
        .iter()
        .flat_map(|i| i.participants.iter().cloned())
        .collect();
    TemporalSnapshot {
        start,
        end,
        incident_count: incidents.len(),
        systems_involved,
        entities_involved,
        incidents,
    }
}
