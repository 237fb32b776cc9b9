//! Shared type definitions for the Witness incident-identity engine.
//!
//! This crate is the single source of truth for the records that flow
//! between the store, the meaning overlay, the snapshot generator and the
//! validator. Types defined here flow downstream to `TypeScript` via `ts-rs`
//! for whatever service layer sits in front of the engine.
//!
//! # Modules
//!
//! - [`ids`] -- Incident and entity keys, minted annotation and snapshot ids
//! - [`enums`] -- Incident types, meaning sources, rule ids, operation kinds
//! - [`structs`] -- Incidents, provenance, meanings, annotations, journal records
//! - [`snapshot`] -- Non-authoritative snapshot views
//! - [`report`] -- Validation reports and violations
//! - [`operation`] -- Operation requests from external layers

pub mod enums;
pub mod ids;
pub mod operation;
pub mod report;
pub mod snapshot;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ArtifactKind, IncidentType, MeaningSource, OperationKind, OperationTarget, RuleId};
pub use ids::{AnnotationId, EntityId, IncidentId, SnapshotId};
pub use operation::OperationRequest;
pub use report::{ValidationReport, Violation};
pub use snapshot::{
    IdentitySnapshot, NON_AUTHORITATIVE_NOTE, RelationshipSnapshot, Snapshot, SnapshotBody,
    SnapshotKind, SystemEntitySummary, SystemSnapshot, TemporalSnapshot, TimelineEntry,
    TimelineSnapshot,
};
pub use structs::{
    Annotation, AnnotationTarget, ArtifactRef, Attestation, IdentitySummary, Incident,
    JournalRecord, MeaningEntry, Provenance,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the `bindings/`
        // directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::IncidentId::export_all();
        let _ = crate::ids::EntityId::export_all();
        let _ = crate::ids::AnnotationId::export_all();
        let _ = crate::ids::SnapshotId::export_all();

        // Enums
        let _ = crate::enums::IncidentType::export_all();
        let _ = crate::enums::MeaningSource::export_all();
        let _ = crate::enums::RuleId::export_all();
        let _ = crate::enums::OperationKind::export_all();
        let _ = crate::enums::OperationTarget::export_all();
        let _ = crate::enums::ArtifactKind::export_all();

        // Records
        let _ = crate::structs::Incident::export_all();
        let _ = crate::structs::Provenance::export_all();
        let _ = crate::structs::ArtifactRef::export_all();
        let _ = crate::structs::Attestation::export_all();
        let _ = crate::structs::MeaningEntry::export_all();
        let _ = crate::structs::AnnotationTarget::export_all();
        let _ = crate::structs::Annotation::export_all();
        let _ = crate::structs::IdentitySummary::export_all();

        // Snapshots
        let _ = crate::snapshot::Snapshot::export_all();
        let _ = crate::snapshot::SnapshotKind::export_all();
        let _ = crate::snapshot::SnapshotBody::export_all();
        let _ = crate::snapshot::IdentitySnapshot::export_all();
        let _ = crate::snapshot::TimelineEntry::export_all();
        let _ = crate::snapshot::TimelineSnapshot::export_all();
        let _ = crate::snapshot::SystemEntitySummary::export_all();
        let _ = crate::snapshot::SystemSnapshot::export_all();
        let _ = crate::snapshot::RelationshipSnapshot::export_all();
        let _ = crate::snapshot::TemporalSnapshot::export_all();

        // Reports and requests
        let _ = crate::report::Violation::export_all();
        let _ = crate::report::ValidationReport::export_all();
        let _ = crate::operation::OperationRequest::export_all();
    }
}
