//! The seam every validation layer plugs into.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::BuildHasher;

use witness_types::{
    Annotation, Incident, IncidentId, MeaningEntry, OperationRequest, RuleId, Snapshot, Violation,
};

/// Lookup of incident ids that are already committed.
///
/// The integrity layer needs it to reject duplicates. The store passes its
/// own id index; audits pass the set of ids seen so far.
pub trait KnownIncidents {
    /// Whether an incident with this id is already committed.
    fn contains_incident(&self, id: &IncidentId) -> bool;
}

impl KnownIncidents for BTreeSet<IncidentId> {
    fn contains_incident(&self, id: &IncidentId) -> bool {
        self.contains(id)
    }
}

impl<S: BuildHasher> KnownIncidents for HashSet<IncidentId, S> {
    fn contains_incident(&self, id: &IncidentId) -> bool {
        self.contains(id)
    }
}

impl<V> KnownIncidents for BTreeMap<IncidentId, V> {
    fn contains_incident(&self, id: &IncidentId) -> bool {
        self.contains_key(id)
    }
}

impl<V, S: BuildHasher> KnownIncidents for HashMap<IncidentId, V, S> {
    fn contains_incident(&self, id: &IncidentId) -> bool {
        self.contains_key(id)
    }
}

/// An empty index, for checking a record in isolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKnownIncidents;

impl KnownIncidents for NoKnownIncidents {
    fn contains_incident(&self, _id: &IncidentId) -> bool {
        false
    }
}

/// Something a rule can be asked to check.
#[derive(Clone, Copy)]
pub enum Subject<'a> {
    /// An incident submitted for append.
    Incident {
        /// The candidate record.
        incident: &'a Incident,
        /// Ids already committed.
        known: &'a dyn KnownIncidents,
    },
    /// A meaning entry submitted to the overlay.
    Meaning(&'a MeaningEntry),
    /// An annotation link submitted to the overlay.
    Annotation(&'a Annotation),
    /// An operation requested by an external layer.
    Operation(&'a OperationRequest),
    /// A generated snapshot.
    Snapshot(&'a Snapshot),
}

impl<'a> Subject<'a> {
    /// Subject for an incident checked against `known`.
    pub fn incident(incident: &'a Incident, known: &'a dyn KnownIncidents) -> Self {
        Self::Incident { incident, known }
    }

    /// Short label used in logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Incident { .. } => "incident",
            Self::Meaning(_) => "meaning",
            Self::Annotation(_) => "annotation",
            Self::Operation(_) => "operation",
            Self::Snapshot(_) => "snapshot",
        }
    }
}

/// A named validation layer.
///
/// Rules are stateless apart from what they were built with. A rule that
/// has nothing to say about a subject kind returns no violations for it.
pub trait Rule: Send + Sync {
    /// The layer this rule reports under.
    fn id(&self) -> RuleId;

    /// Check one subject.
    fn check(&self, subject: &Subject<'_>) -> Vec<Violation>;
}
