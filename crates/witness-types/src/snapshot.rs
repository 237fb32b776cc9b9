//! Snapshot view types.
//!
//! A snapshot is a projection of the store and overlay at generation time.
//! It is never authoritative, can be deleted at any moment, and carries no
//! information that cannot be derived again from current state.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::IncidentType;
use crate::ids::{EntityId, SnapshotId};
use crate::structs::{Annotation, Incident};

/// Notice stamped on every snapshot.
pub const NON_AUTHORITATIVE_NOTE: &str =
    "This snapshot is a view, not authoritative. It can be regenerated or deleted.";

/// A generated, non-authoritative view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Snapshot {
    /// Identifier within the snapshot cache.
    pub snapshot_id: SnapshotId,
    /// When the view was generated.
    pub generated_at: DateTime<Utc>,
    /// Always `false` for snapshots produced by the generator.
    pub authoritative: bool,
    /// The non-authority notice.
    pub note: String,
    /// The projected content.
    pub body: SnapshotBody,
}

impl Snapshot {
    /// Wrap a body with a fresh id, timestamp and the non-authority notice.
    pub fn new(body: SnapshotBody) -> Self {
        Self {
            snapshot_id: SnapshotId::new(),
            generated_at: Utc::now(),
            authoritative: false,
            note: NON_AUTHORITATIVE_NOTE.to_owned(),
            body,
        }
    }

    /// Whether two snapshots project the same content.
    ///
    /// Ignores the id and generation time.
    pub fn same_content(&self, other: &Self) -> bool {
        self.body == other.body
    }

    /// The kind of view.
    pub const fn kind(&self) -> SnapshotKind {
        self.body.kind()
    }
}

/// The kind of a snapshot view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// One entity's derived identity.
    Identity,
    /// One entity's incidents in date order.
    Timeline,
    /// All incidents of one system.
    System,
    /// Incidents shared by two entities.
    Relationship,
    /// Incidents within a date range.
    Temporal,
}

/// Content of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotBody {
    /// See [`IdentitySnapshot`].
    Identity(IdentitySnapshot),
    /// See [`TimelineSnapshot`].
    Timeline(TimelineSnapshot),
    /// See [`SystemSnapshot`].
    System(SystemSnapshot),
    /// See [`RelationshipSnapshot`].
    Relationship(RelationshipSnapshot),
    /// See [`TemporalSnapshot`].
    Temporal(TemporalSnapshot),
}

impl SnapshotBody {
    /// The kind of view.
    pub const fn kind(&self) -> SnapshotKind {
        match self {
            Self::Identity(_) => SnapshotKind::Identity,
            Self::Timeline(_) => SnapshotKind::Timeline,
            Self::System(_) => SnapshotKind::System,
            Self::Relationship(_) => SnapshotKind::Relationship,
            Self::Temporal(_) => SnapshotKind::Temporal,
        }
    }

    /// Incidents embedded in the body.
    ///
    /// Used by audits to re-run text rules over cached views.
    pub fn incidents(&self) -> Vec<&Incident> {
        match self {
            Self::Identity(_) => Vec::new(),
            Self::Timeline(t) => t.entries.iter().map(|e| &e.incident).collect(),
            Self::System(s) => s.incidents.iter().collect(),
            Self::Relationship(r) => r.shared_incidents.iter().collect(),
            Self::Temporal(t) => t.incidents.iter().collect(),
        }
    }
}

/// One entity's derived identity plus attached meanings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct IdentitySnapshot {
    /// The entity.
    pub entity_id: EntityId,
    /// Number of incidents that include the entity.
    pub incident_count: usize,
    /// Earliest incident date.
    pub first_seen: Option<DateTime<Utc>>,
    /// Latest incident date.
    pub last_seen: Option<DateTime<Utc>>,
    /// Distinct systems.
    pub systems: BTreeSet<String>,
    /// Distinct incident types.
    pub incident_types: BTreeSet<IncidentType>,
    /// Entities sharing at least one incident.
    pub co_participants: BTreeSet<EntityId>,
    /// Annotations on the entity and on its incidents.
    pub meanings: Vec<Annotation>,
}

/// One incident of a timeline with its annotations embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineEntry {
    /// The incident.
    pub incident: Incident,
    /// Annotations bound to the incident.
    pub annotations: Vec<Annotation>,
}

/// One entity's incidents in date order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimelineSnapshot {
    /// The entity.
    pub entity_id: EntityId,
    /// Entries in date order.
    pub entries: Vec<TimelineEntry>,
}

/// Per-entity summary inside a system snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SystemEntitySummary {
    /// Incidents of the system that include the entity.
    pub incident_count: usize,
    /// Earliest such incident.
    pub first_seen: DateTime<Utc>,
    /// Latest such incident.
    pub last_seen: DateTime<Utc>,
}

/// All incidents tagged with one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SystemSnapshot {
    /// The system tag.
    pub system: String,
    /// Number of incidents.
    pub incident_count: usize,
    /// Entities involved and their summaries.
    pub entities: BTreeMap<EntityId, SystemEntitySummary>,
    /// Incidents in date order.
    pub incidents: Vec<Incident>,
}

/// Incidents in which two entities both participate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RelationshipSnapshot {
    /// First entity.
    pub entity1: EntityId,
    /// Second entity.
    pub entity2: EntityId,
    /// Number of shared incidents.
    pub interaction_count: usize,
    /// Shared incidents in date order.
    pub shared_incidents: Vec<Incident>,
}

/// Incidents within an inclusive date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TemporalSnapshot {
    /// Range start, inclusive.
    pub start: DateTime<Utc>,
    /// Range end, inclusive.
    pub end: DateTime<Utc>,
    /// Number of incidents in range.
    pub incident_count: usize,
    /// Distinct systems in range.
    pub systems_involved: BTreeSet<String>,
    /// Distinct entities in range.
    pub entities_involved: BTreeSet<EntityId>,
    /// Incidents in date order.
    pub incidents: Vec<Incident>,
}
