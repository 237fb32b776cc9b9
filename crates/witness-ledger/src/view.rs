//! Point-in-time reads of the incident store.
//!
//! A [`LedgerView`] shares the store's indexes at the moment it was taken.
//! Later appends copy the indexes before changing them, so a view never
//! sees a half-applied write and never changes under its holder.
//!
//! All chronological queries order by `(date, append position)`, so
//! incidents with equal dates come back in the order they were appended.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use witness_types::{EntityId, IdentitySummary, Incident, IncidentId};

use crate::identity::summarize;

// ---------------------------------------------------------------------------
// Shared index
// ---------------------------------------------------------------------------

/// Incidents plus the indexes the queries run on.
#[derive(Debug, Clone, Default)]
pub(crate) struct Index {
    /// Incidents in append order.
    pub(crate) incidents: Vec<Arc<Incident>>,
    /// Append position by incident id.
    pub(crate) by_id: HashMap<IncidentId, usize>,
    /// Append positions sorted by `(date, position)`.
    pub(crate) chronological: Vec<usize>,
    /// Per-entity append positions sorted by `(date, position)`.
    pub(crate) by_entity: BTreeMap<EntityId, Vec<usize>>,
}

impl Index {
    /// Push a validated incident and update every index.
    pub(crate) fn insert(&mut self, incident: Arc<Incident>) {
        let position = self.incidents.len();
        let date = incident.date;

        // The new position is the largest, so among equal dates it sorts last.
        let incidents = &self.incidents;
        let not_after = |p: &usize| incidents.get(*p).is_some_and(|i| i.date <= date);

        let at = self.chronological.partition_point(not_after);
        self.chronological.insert(at, position);

        for entity in &incident.participants {
            let positions = self.by_entity.entry(entity.clone()).or_default();
            let at = positions.partition_point(not_after);
            positions.insert(at, position);
        }

        self.by_id.insert(incident.incident_id.clone(), position);
        self.incidents.push(incident);
    }

    fn at(&self, position: usize) -> Option<&Arc<Incident>> {
        self.incidents.get(position)
    }
}

// ---------------------------------------------------------------------------
// LedgerView
// ---------------------------------------------------------------------------

/// A consistent, read-only view of the store.
#[derive(Debug, Clone)]
pub struct LedgerView {
    index: Arc<Index>,
}

impl LedgerView {
    pub(crate) const fn new(index: Arc<Index>) -> Self {
        Self { index }
    }

    /// Number of incidents.
    pub fn len(&self) -> usize {
        self.index.incidents.len()
    }

    /// Whether the view holds no incidents.
    pub fn is_empty(&self) -> bool {
        self.index.incidents.is_empty()
    }

    /// Whether an incident with this id is present.
    pub fn contains(&self, id: &IncidentId) -> bool {
        self.index.by_id.contains_key(id)
    }

    /// The incident with this id.
    pub fn get(&self, id: &IncidentId) -> Option<&Arc<Incident>> {
        self.index.by_id.get(id).and_then(|p| self.index.at(*p))
    }

    /// The id index, for duplicate checks.
    pub fn ids(&self) -> &HashMap<IncidentId, usize> {
        &self.index.by_id
    }

    /// All incidents in append order.
    pub fn all(&self) -> impl Iterator<Item = &Arc<Incident>> + '_ {
        self.index.incidents.iter()
    }

    /// All incidents in chronological order.
    pub fn chronological(&self) -> impl Iterator<Item = &Arc<Incident>> + '_ {
        self.index
            .chronological
            .iter()
            .filter_map(|p| self.index.at(*p))
    }

    /// Incidents that include `entity`, in chronological order.
    pub fn by_entity<'a>(&'a self, entity: &str) -> impl Iterator<Item = &'a Arc<Incident>> + use<'a> {
        self.index
            .by_entity
            .get(entity)
            .into_iter()
            .flatten()
            .filter_map(|p| self.index.at(*p))
    }

    /// Incidents tagged with `system`, in chronological order.
    pub fn by_system<'a>(&'a self, system: &'a str) -> impl Iterator<Item = &'a Arc<Incident>> + 'a {
        self.chronological().filter(move |i| i.system == system)
    }

    /// Incidents dated within `[start, end]`, in chronological order.
    ///
    /// An inverted range yields nothing.
    pub fn by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &Arc<Incident>> + '_ {
        let first = self
            .index
            .chronological
            .partition_point(|p| self.index.at(*p).is_some_and(|i| i.date < start));
        self.index
            .chronological
            .iter()
            .skip(first)
            .filter_map(|p| self.index.at(*p))
            .take_while(move |i| i.date <= end)
    }

    /// Distinct systems.
    pub fn systems(&self) -> BTreeSet<String> {
        self.all().map(|i| i.system.clone()).collect()
    }

    /// Distinct entities.
    pub fn entities(&self) -> BTreeSet<EntityId> {
        self.index.by_entity.keys().cloned().collect()
    }

    /// Whether `entity` participates in any incident.
    pub fn has_entity(&self, entity: &str) -> bool {
        self.index.by_entity.contains_key(entity)
    }

    /// The derived identity of `entity` over this view.
    pub fn identity(&self, entity: &str) -> IdentitySummary {
        summarize(EntityId::new(entity), self.by_entity(entity).map(Arc::as_ref))
    }
}
