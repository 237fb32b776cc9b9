//! Derived entity identity.
//!
//! An entity's identity is the set of incidents that include it, and
//! nothing else. [`EntityIdentity`] holds no incident data of its own: every
//! accessor takes a fresh [`LedgerView`] and recomputes, so two calls with
//! no append in between always agree.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use witness_types::{EntityId, IdentitySummary, Incident, IncidentType};

use crate::{IncidentStore, LedgerError, LedgerView};

/// Fold incidents that include `entity` into a summary.
///
/// `incidents` is expected in chronological order; `first_seen` and
/// `last_seen` are computed as min and max regardless.
pub fn summarize<'a>(
    entity_id: EntityId,
    incidents: impl Iterator<Item = &'a Incident>,
) -> IdentitySummary {
    let mut summary = IdentitySummary {
        entity_id,
        incident_count: 0,
        first_seen: None,
        last_seen: None,
        systems: BTreeSet::new(),
        incident_types: BTreeSet::new(),
        co_participants: BTreeSet::new(),
    };
    for incident in incidents {
        summary.incident_count = summary.incident_count.saturating_add(1);
        summary.first_seen = Some(summary.first_seen.map_or(incident.date, |d| d.min(incident.date)));
        summary.last_seen = Some(summary.last_seen.map_or(incident.date, |d| d.max(incident.date)));
        summary.systems.insert(incident.system.clone());
        summary.incident_types.insert(incident.incident_type);
        summary.co_participants.extend(
            incident
                .participants
                .iter()
                .filter(|p| **p != summary.entity_id)
                .cloned(),
        );
    }
    summary
}

/// An entity's identity, derived from the store on every call.
#[derive(Debug, Clone)]
pub struct EntityIdentity<'a> {
    entity_id: EntityId,
    store: &'a IncidentStore,
}

impl<'a> EntityIdentity<'a> {
    /// Identity of `entity_id` over `store`.
    pub fn new(entity_id: impl Into<EntityId>, store: &'a IncidentStore) -> Self {
        Self {
            entity_id: entity_id.into(),
            store,
        }
    }

    /// The entity.
    pub const fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    fn view(&self) -> Result<LedgerView, LedgerError> {
        self.store.view()
    }

    /// Incidents that include the entity, in chronological order.
    pub fn incidents(&self) -> Result<Vec<Arc<Incident>>, LedgerError> {
        let view = self.view()?;
        Ok(view.by_entity(self.entity_id.as_str()).cloned().collect())
    }

    /// Number of incidents that include the entity.
    pub fn incident_count(&self) -> Result<usize, LedgerError> {
        Ok(self.view()?.by_entity(self.entity_id.as_str()).count())
    }

    /// Distinct systems the entity appears in.
    pub fn systems(&self) -> Result<BTreeSet<String>, LedgerError> {
        Ok(self.summary()?.systems)
    }

    /// Other entities sharing at least one incident.
    pub fn co_participants(&self) -> Result<BTreeSet<EntityId>, LedgerError> {
        Ok(self.summary()?.co_participants)
    }

    /// Distinct incident types the entity appears in.
    pub fn incident_types(&self) -> Result<BTreeSet<IncidentType>, LedgerError> {
        Ok(self.summary()?.incident_types)
    }

    /// Date of the earliest incident, if any.
    pub fn first_seen(&self) -> Result<Option<DateTime<Utc>>, LedgerError> {
        let view = self.view()?;
        Ok(view.by_entity(self.entity_id.as_str()).next().map(|i| i.date))
    }

    /// Date of the latest incident, if any.
    pub fn last_seen(&self) -> Result<Option<DateTime<Utc>>, LedgerError> {
        let view = self.view()?;
        Ok(view.by_entity(self.entity_id.as_str()).last().map(|i| i.date))
    }

    /// Every derivation at once, over a single view.
    pub fn summary(&self) -> Result<IdentitySummary, LedgerError> {
        Ok(self.view()?.identity(self.entity_id.as_str()))
    }

    /// Append a new incident that includes the entity.
    ///
    /// The entity is added to the participants if the caller left it out.
    /// Everything else goes through [`IncidentStore::append`] unchanged.
    pub fn add_incident(&self, mut incident: Incident) -> Result<Arc<Incident>, LedgerError> {
        incident.participants.insert(self.entity_id.clone());
        self.store.append(incident)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use witness_validator::{Validator, ValidatorConfig};

    use super::*;
    use crate::IncidentBuilder;

    fn store() -> IncidentStore {
        IncidentStore::new(Arc::new(Validator::new(ValidatorConfig::default()).unwrap()))
    }

    fn incident(day: u32, id: &str, system: &str, who: &[&str]) -> Incident {
        IncidentBuilder::new(id, system)
            .date(Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap())
            .incident_type(IncidentType::Interaction)
            .participants(who.iter().copied())
            .fact("the parties met in the hall")
            .build()
            .unwrap()
    }

    #[test]
    fn unknown_entity_has_empty_identity() {
        let store = store();
        let identity = EntityIdentity::new("ghost", &store);
        assert_eq!(identity.incident_count().unwrap(), 0);
        assert_eq!(identity.first_seen().unwrap(), None);
        assert!(identity.systems().unwrap().is_empty());
    }

    #[test]
    fn identity_tracks_new_incidents() {
        let store = store();
        let identity = EntityIdentity::new("a", &store);
        store.append(incident(2, "i1", "mail", &["a", "b"])).unwrap();
        assert_eq!(identity.incident_count().unwrap(), 1);

        store.append(incident(1, "i2", "radio", &["a", "c"])).unwrap();
        store.append(incident(3, "i3", "mail", &["b", "c"])).unwrap();

        let summary = identity.summary().unwrap();
        assert_eq!(summary.incident_count, 2);
        assert_eq!(summary.systems.len(), 2);
        assert_eq!(
            summary.co_participants,
            BTreeSet::from([EntityId::new("b"), EntityId::new("c")])
        );
        assert_eq!(summary.first_seen, identity.first_seen().unwrap());
        assert_eq!(
            identity.last_seen().unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn repeated_reads_agree() {
        let store = store();
        store.append(incident(1, "i1", "mail", &["a", "b"])).unwrap();
        let identity = EntityIdentity::new("a", &store);
        assert_eq!(identity.summary().unwrap(), identity.summary().unwrap());
    }

    #[test]
    fn add_incident_inserts_the_entity() {
        let store = store();
        let identity = EntityIdentity::new("a", &store);
        let committed = identity.add_incident(incident(1, "i1", "mail", &["b"])).unwrap();
        assert!(committed.involves("a"));
        assert_eq!(identity.incidents().unwrap().len(), 1);
    }

    #[test]
    fn add_incident_goes_through_validation() {
        let store = store();
        let identity = EntityIdentity::new("a", &store);
        let mut bad = incident(1, "i1", "mail", &["b"]);
        bad.facts = vec!["a will return".to_owned()];
        assert!(matches!(identity.add_incident(bad), Err(LedgerError::Validation(_))));
        assert_eq!(identity.incident_count().unwrap(), 0);
    }
}
