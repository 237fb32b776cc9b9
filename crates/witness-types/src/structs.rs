//! Core record structs: incidents, meanings, annotations, identity summaries.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ArtifactKind, IncidentType, MeaningSource};
use crate::ids::{AnnotationId, EntityId, IncidentId};

// ---------------------------------------------------------------------------
// Incident
// ---------------------------------------------------------------------------

/// Source-of-truth record of something that happened.
///
/// Incidents are created once by a caller and never change afterwards. The
/// store only ever hands out shared immutable references to them, so there
/// is no code path that rewrites a field in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Incident {
    /// Unique identifier across the store.
    pub incident_id: IncidentId,
    /// When the incident occurred.
    pub date: DateTime<Utc>,
    /// Tag of the context the incident originated in.
    pub system: String,
    /// Descriptive classification.
    #[serde(default)]
    pub incident_type: IncidentType,
    /// Entities involved. Never empty for a committed incident.
    pub participants: BTreeSet<EntityId>,
    /// Observable or attestable statements, in the order recorded.
    pub facts: Vec<String>,
    /// Supplementary descriptive data.
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub context: BTreeMap<String, serde_json::Value>,
    /// Plain-language description.
    #[serde(default)]
    pub summary: String,
    /// What occurred.
    #[serde(default)]
    pub outcome: String,
    /// Free-form bookkeeping supplied by the recording system.
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Where the content of this incident came from.
    #[serde(default)]
    pub provenance: Provenance,
}

impl Incident {
    /// Whether `entity` is among the participants.
    pub fn involves(&self, entity: &str) -> bool {
        self.participants.contains(entity)
    }

    /// Iterate every free-text field as `(field path, text)` pairs.
    ///
    /// Field paths use the form `facts[2]`, `summary`, `outcome`.
    pub fn text_fields(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.facts
            .iter()
            .enumerate()
            .map(|(i, fact)| (format!("facts[{i}]"), fact.as_str()))
            .chain([
                ("summary".to_owned(), self.summary.as_str()),
                ("outcome".to_owned(), self.outcome.as_str()),
            ])
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Origin of an incident's content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Submitted by an external system through the service layer.
    #[default]
    External,
    /// Observed and attested by a named person or system.
    Attested {
        /// Who attests to the observation.
        attested_by: String,
    },
    /// Produced from a derived artifact such as a snapshot.
    Derived {
        /// The artifact the content was generated from.
        artifact: ArtifactRef,
        /// Separate observation confirming the content, if any.
        attestation: Option<Attestation>,
    },
}

/// Reference to a derived artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ArtifactRef {
    /// What kind of artifact.
    pub kind: ArtifactKind,
    /// Its identifier, e.g. a snapshot id.
    pub reference: String,
}

/// A separately recorded observation that confirms derived content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attestation {
    /// Person or external system making the observation.
    pub attested_by: String,
    /// When the observation was made.
    pub attested_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Meaning
// ---------------------------------------------------------------------------

/// Descriptive annotation content drawn from one interpretive source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MeaningEntry {
    /// The term being described.
    pub term: String,
    /// Interpretive source.
    pub source: MeaningSource,
    /// Descriptive definition.
    pub definition: String,
    /// Example usages, in order.
    #[serde(default)]
    pub usage_examples: Vec<String>,
    /// Supplementary context, e.g. the cultures or regions concerned.
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub context: BTreeMap<String, serde_json::Value>,
    /// Terms that are discussed alongside this one.
    #[serde(default)]
    pub related_terms: Vec<String>,
}

impl MeaningEntry {
    /// Create an entry with no usage examples or context.
    pub fn new(term: impl Into<String>, source: MeaningSource, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            source,
            definition: definition.into(),
            usage_examples: Vec::new(),
            context: BTreeMap::new(),
            related_terms: Vec::new(),
        }
    }

    /// Attach usage examples.
    #[must_use]
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.usage_examples = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Iterate every free-text field as `(field path, text)` pairs.
    pub fn text_fields(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        core::iter::once(("definition".to_owned(), self.definition.as_str())).chain(
            self.usage_examples
                .iter()
                .enumerate()
                .map(|(i, ex)| (format!("usage_examples[{i}]"), ex.as_str())),
        )
    }
}

/// What an annotation is attached to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum AnnotationTarget {
    /// A committed incident.
    Incident(IncidentId),
    /// An entity that participates in at least one incident.
    Entity(EntityId),
}

impl core::fmt::Display for AnnotationTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Incident(id) => write!(f, "incident:{id}"),
            Self::Entity(id) => write!(f, "entity:{id}"),
        }
    }
}

/// Link binding a meaning to an incident or entity.
///
/// The annotated record itself is never touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Annotation {
    /// Unique link identifier.
    pub annotation_id: AnnotationId,
    /// The annotated record.
    pub target: AnnotationTarget,
    /// The term as it appears in the annotated record.
    pub term: String,
    /// The bound meaning.
    pub meaning: MeaningEntry,
    /// When the link was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Identity summary
// ---------------------------------------------------------------------------

/// Serializable summary of an entity's derived identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct IdentitySummary {
    /// The entity.
    pub entity_id: EntityId,
    /// Number of incidents that include the entity.
    pub incident_count: usize,
    /// Date of the earliest such incident.
    pub first_seen: Option<DateTime<Utc>>,
    /// Date of the latest such incident.
    pub last_seen: Option<DateTime<Utc>>,
    /// Distinct systems the entity appears in.
    pub systems: BTreeSet<String>,
    /// Distinct incident types the entity appears in.
    pub incident_types: BTreeSet<IncidentType>,
    /// Other entities sharing at least one incident.
    pub co_participants: BTreeSet<EntityId>,
}

// ---------------------------------------------------------------------------
// Journal records
// ---------------------------------------------------------------------------

/// One durable record handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum JournalRecord {
    /// A committed incident.
    Incident(Incident),
    /// A stored meaning entry.
    Meaning(MeaningEntry),
    /// A created annotation link.
    Annotation(Annotation),
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn incident() -> Incident {
        Incident {
            incident_id: IncidentId::new("incident_001"),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap_or_default(),
            system: "mail".to_owned(),
            incident_type: IncidentType::Communication,
            participants: [EntityId::new("a"), EntityId::new("b")].into_iter().collect(),
            facts: vec!["a sent a letter to b".to_owned(), "b replied".to_owned()],
            context: BTreeMap::new(),
            summary: "exchange of letters".to_owned(),
            outcome: "b received the letter".to_owned(),
            metadata: BTreeMap::new(),
            provenance: Provenance::External,
        }
    }

    #[test]
    fn text_fields_cover_facts_summary_and_outcome() {
        let incident = incident();
        let fields: Vec<String> = incident.text_fields().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["facts[0]", "facts[1]", "summary", "outcome"]);
    }

    #[test]
    fn minimal_document_fills_defaults() {
        let json = r#"{
            "incident_id": "i1",
            "date": "2024-03-01T12:00:00Z",
            "system": "mail",
            "participants": ["a"],
            "facts": ["a arrived"]
        }"#;
        let parsed: Result<Incident, _> = serde_json::from_str(json);
        assert!(parsed.is_ok());
        let parsed = parsed.unwrap_or_else(|_| incident());
        assert_eq!(parsed.incident_type, IncidentType::Other);
        assert_eq!(parsed.provenance, Provenance::External);
        assert!(parsed.summary.is_empty());
    }

    #[test]
    fn journal_record_is_tagged() {
        let record = JournalRecord::Incident(incident());
        let value = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(value["record"], "incident");
        assert_eq!(value["provenance"]["kind"], "external");
    }

    #[test]
    fn meaning_text_fields_include_examples() {
        let entry = MeaningEntry::new("communication", MeaningSource::Etymology, "from Latin")
            .with_examples(["sharing news"]);
        let fields: Vec<String> = entry.text_fields().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["definition", "usage_examples[0]"]);
    }
}
