//! Enumeration types shared across the workspace.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Incident classification
// ---------------------------------------------------------------------------

/// Descriptive classification of an incident.
///
/// Purely a label. Nothing in the engine branches on it except for the
/// `incident_types` derivation of an identity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    /// Something was seen or measured.
    Observation,
    /// Two or more participants acted toward each other.
    Interaction,
    /// A participant's state changed.
    StateChange,
    /// A message was exchanged.
    Communication,
    /// An event raised by the originating system itself.
    SystemEvent,
    /// Anything else.
    #[default]
    Other,
}

// ---------------------------------------------------------------------------
// Meaning sources
// ---------------------------------------------------------------------------

/// Interpretive source of a meaning entry.
///
/// The enumeration is closed at compile time; a deployment narrows it
/// further through the validator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum MeaningSource {
    /// Origin and history of the word.
    Etymology,
    /// Usage within a culture or community.
    Cultural,
    /// Regional or geographic context.
    Geographic,
    /// Role the term plays within a narrative.
    Narrative,
    /// Definition within a technical field.
    Technical,
    /// Historical context of the term.
    Historical,
}

impl MeaningSource {
    /// Every source known to this build.
    pub const ALL: [Self; 6] = [
        Self::Etymology,
        Self::Cultural,
        Self::Geographic,
        Self::Narrative,
        Self::Technical,
        Self::Historical,
    ];

    /// Sources accepted when no configuration narrows the set.
    pub const DEFAULT_ALLOWED: [Self; 4] =
        [Self::Etymology, Self::Cultural, Self::Geographic, Self::Narrative];

    /// The `snake_case` wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Etymology => "etymology",
            Self::Cultural => "cultural",
            Self::Geographic => "geographic",
            Self::Narrative => "narrative",
            Self::Technical => "technical",
            Self::Historical => "historical",
        }
    }
}

impl core::fmt::Display for MeaningSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Validation rules
// ---------------------------------------------------------------------------

/// Identifier of a validation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// Prediction, prescription, destiny and agency markers in free text.
    Safety,
    /// Modify, delete and overwrite requests against authoritative storage.
    AppendOnly,
    /// Derived artifacts fed back as new incidents.
    NoAgency,
    /// Structural validity of records.
    Integrity,
}

impl RuleId {
    /// The `snake_case` wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safety => "safety",
            Self::AppendOnly => "append_only",
            Self::NoAgency => "no_agency",
            Self::Integrity => "integrity",
        }
    }
}

impl core::fmt::Display for RuleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Operation requests
// ---------------------------------------------------------------------------

/// The kind of operation an external layer asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Add a new record after the existing ones.
    Append,
    /// Read records.
    Read,
    /// Change a field of an existing record.
    Modify,
    /// Remove an existing record.
    Delete,
    /// Replace an existing record wholesale.
    Overwrite,
}

impl OperationKind {
    /// Whether this operation would alter or remove committed records.
    pub const fn alters_history(self) -> bool {
        matches!(self, Self::Modify | Self::Delete | Self::Overwrite)
    }
}

impl core::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Append => "append",
            Self::Read => "read",
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Overwrite => "overwrite",
        };
        f.write_str(name)
    }
}

/// The storage an operation is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum OperationTarget {
    /// The authoritative incident store.
    IncidentStore,
    /// Meaning entries and annotation links.
    MeaningOverlay,
    /// The transient cache of generated snapshots.
    SnapshotCache,
}

impl OperationTarget {
    /// Whether the target holds authoritative, append-only records.
    pub const fn is_append_only(self) -> bool {
        matches!(self, Self::IncidentStore | Self::MeaningOverlay)
    }
}

impl core::fmt::Display for OperationTarget {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::IncidentStore => "incident_store",
            Self::MeaningOverlay => "meaning_overlay",
            Self::SnapshotCache => "snapshot_cache",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Derived artifacts
// ---------------------------------------------------------------------------

/// A kind of artifact the engine derives rather than records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A generated snapshot.
    Snapshot,
    /// A meaning annotation.
    Annotation,
    /// An entity identity view.
    IdentityView,
}

impl core::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Snapshot => "snapshot",
            Self::Annotation => "annotation",
            Self::IdentityView => "identity_view",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_history_altering_kinds_are_flagged() {
        assert!(OperationKind::Modify.alters_history());
        assert!(OperationKind::Delete.alters_history());
        assert!(OperationKind::Overwrite.alters_history());
        assert!(!OperationKind::Append.alters_history());
        assert!(!OperationKind::Read.alters_history());
    }

    #[test]
    fn snapshot_cache_is_not_append_only() {
        assert!(OperationTarget::IncidentStore.is_append_only());
        assert!(OperationTarget::MeaningOverlay.is_append_only());
        assert!(!OperationTarget::SnapshotCache.is_append_only());
    }

    #[test]
    fn meaning_source_wire_names_match_serde() {
        for source in MeaningSource::ALL {
            let json = serde_json::to_string(&source).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", source.as_str()));
        }
    }

    #[test]
    fn incident_type_defaults_to_other() {
        assert_eq!(IncidentType::default(), IncidentType::Other);
    }
}
