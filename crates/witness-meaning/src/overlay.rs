//! The meaning overlay: descriptive entries and annotation links.
//!
//! # Design
//!
//! - **Side table**: the overlay references incidents and entities by id and
//!   never changes them. A link needs its target to exist in the store.
//! - **Add-only**: entries and links are never edited or removed; requests
//!   for it are refused through [`MeaningOverlay::execute`].
//! - **Shared gate**: writes take the incident store's write gate, so
//!   overlay writes and incident appends happen one at a time and a reader
//!   holding the gate sees both sides agree.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use witness_ledger::{IncidentStore, Journal};
use witness_types::{
    Annotation, AnnotationId, AnnotationTarget, EntityId, IncidentId, JournalRecord, MeaningEntry,
    MeaningSource, OperationKind, OperationRequest, OperationTarget, RuleId, ValidationReport,
};
use witness_validator::{Validator, log_rejection};

use crate::MeaningError;
use crate::view::{OverlayIndex, OverlayView};

// ---------------------------------------------------------------------------
// Operation requests
// ---------------------------------------------------------------------------

/// An operation requested against the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum MeaningOperation {
    /// Store a new meaning entry.
    AddMeaning(MeaningEntry),
    /// Link a meaning to an incident.
    AnnotateIncident {
        /// The incident.
        incident_id: IncidentId,
        /// The term as it appears in the incident.
        term: String,
        /// The bound meaning.
        meaning: MeaningEntry,
    },
    /// Link a meaning to an entity.
    AnnotateEntity {
        /// The entity.
        entity_id: EntityId,
        /// The term being described.
        term: String,
        /// The bound meaning.
        meaning: MeaningEntry,
    },
    /// Change one field of a stored entry or link.
    Modify {
        /// Term or annotation id.
        reference: String,
        /// Name of the field.
        field: String,
        /// Replacement value.
        value: Value,
    },
    /// Remove a stored entry or link.
    Delete {
        /// Term or annotation id.
        reference: String,
    },
    /// Replace a stored entry wholesale.
    Overwrite {
        /// Term or annotation id.
        reference: String,
        /// The replacement.
        entry: MeaningEntry,
    },
}

impl MeaningOperation {
    /// Classify the operation for the append-only rule.
    pub fn request(&self) -> OperationRequest {
        let (kind, reference) = match self {
            Self::AddMeaning(entry) => (OperationKind::Append, entry.term.as_str()),
            Self::AnnotateIncident { incident_id, .. } => (OperationKind::Append, incident_id.as_str()),
            Self::AnnotateEntity { entity_id, .. } => (OperationKind::Append, entity_id.as_str()),
            Self::Modify { reference, .. } => (OperationKind::Modify, reference.as_str()),
            Self::Delete { reference } => (OperationKind::Delete, reference.as_str()),
            Self::Overwrite { reference, .. } => (OperationKind::Overwrite, reference.as_str()),
        };
        OperationRequest::new(kind, OperationTarget::MeaningOverlay).on(reference)
    }
}

/// What a successful [`MeaningOperation`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayRecord {
    /// A stored entry.
    Meaning(Arc<MeaningEntry>),
    /// A created link.
    Annotation(Arc<Annotation>),
}

// ---------------------------------------------------------------------------
// MeaningOverlay
// ---------------------------------------------------------------------------

/// Add-only side table of meanings and annotation links.
pub struct MeaningOverlay {
    store: Arc<IncidentStore>,
    validator: Arc<Validator>,
    journal: Option<Arc<dyn Journal>>,
    state: RwLock<Arc<OverlayIndex>>,
}

impl core::fmt::Debug for MeaningOverlay {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MeaningOverlay")
            .field("store", &self.store)
            .field("journaled", &self.journal.is_some())
            .finish_non_exhaustive()
    }
}

impl MeaningOverlay {
    /// Create an empty overlay over `store`.
    ///
    /// Accepted entries and links are handed to `journal` when one is given.
    pub fn new(
        store: Arc<IncidentStore>,
        validator: Arc<Validator>,
        journal: Option<Arc<dyn Journal>>,
    ) -> Self {
        Self {
            store,
            validator,
            journal,
            state: RwLock::new(Arc::new(OverlayIndex::default())),
        }
    }

    /// The store annotation targets are resolved against.
    pub const fn store(&self) -> &Arc<IncidentStore> {
        &self.store
    }

    /// A consistent, point-in-time view.
    pub fn view(&self) -> Result<OverlayView, MeaningError> {
        let Ok(state) = self.state.read() else {
            return Err(MeaningError::LockPoisoned("meaning overlay state"));
        };
        Ok(OverlayView::new(Arc::clone(&state)))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Validate and store a meaning entry.
    ///
    /// # Errors
    ///
    /// - [`MeaningError::InvalidMeaning`] for an empty term or definition, or
    ///   a source the configuration does not allow.
    /// - [`MeaningError::Validation`] if the safety or provenance layers
    ///   reject the text.
    /// - [`MeaningError::Journal`] if the journal refuses the record.
    pub fn add_meaning(&self, entry: MeaningEntry) -> Result<Arc<MeaningEntry>, MeaningError> {
        let _gate = self.store.write_gate()?;
        self.commit_meaning(entry, true)
    }

    /// Re-store an entry read back from the journal, without journaling it again.
    pub fn replay_meaning(&self, entry: MeaningEntry) -> Result<Arc<MeaningEntry>, MeaningError> {
        let _gate = self.store.write_gate()?;
        self.commit_meaning(entry, false)
    }

    /// Link `meaning` to a committed incident.
    ///
    /// # Errors
    ///
    /// [`MeaningError::UnknownReference`] if the store holds no such
    /// incident; otherwise as [`add_meaning`](Self::add_meaning).
    pub fn annotate_incident(
        &self,
        incident_id: impl Into<IncidentId>,
        term: impl Into<String>,
        meaning: MeaningEntry,
    ) -> Result<Arc<Annotation>, MeaningError> {
        let annotation = link(AnnotationTarget::Incident(incident_id.into()), term, meaning);
        let _gate = self.store.write_gate()?;
        self.commit_annotation(annotation, true)
    }

    /// Link `meaning` to an entity that appears in at least one incident.
    ///
    /// # Errors
    ///
    /// [`MeaningError::UnknownReference`] if no committed incident names the
    /// entity; otherwise as [`add_meaning`](Self::add_meaning).
    pub fn annotate_entity(
        &self,
        entity_id: impl Into<EntityId>,
        term: impl Into<String>,
        meaning: MeaningEntry,
    ) -> Result<Arc<Annotation>, MeaningError> {
        let annotation = link(AnnotationTarget::Entity(entity_id.into()), term, meaning);
        let _gate = self.store.write_gate()?;
        self.commit_annotation(annotation, true)
    }

    /// Re-store a link read back from the journal, without journaling it again.
    ///
    /// # Errors
    ///
    /// [`MeaningError::DuplicateAnnotation`] if the id is already stored;
    /// otherwise as [`annotate_incident`](Self::annotate_incident).
    pub fn replay_annotation(&self, annotation: Annotation) -> Result<Arc<Annotation>, MeaningError> {
        let _gate = self.store.write_gate()?;
        self.commit_annotation(annotation, false)
    }

    /// Handle an operation request from an external layer.
    ///
    /// Adds and annotations are forwarded. Modify, delete and overwrite are
    /// refused through the append-only rule and leave the overlay untouched.
    pub fn execute(&self, operation: MeaningOperation) -> Result<OverlayRecord, MeaningError> {
        let request = operation.request();
        match operation {
            MeaningOperation::AddMeaning(entry) => self.add_meaning(entry).map(OverlayRecord::Meaning),
            MeaningOperation::AnnotateIncident { incident_id, term, meaning } => self
                .annotate_incident(incident_id, term, meaning)
                .map(OverlayRecord::Annotation),
            MeaningOperation::AnnotateEntity { entity_id, term, meaning } => self
                .annotate_entity(entity_id, term, meaning)
                .map(OverlayRecord::Annotation),
            MeaningOperation::Modify { .. }
            | MeaningOperation::Delete { .. }
            | MeaningOperation::Overwrite { .. } => {
                let report = self.validator.check_operation(&request);
                log_rejection("execute", &report);
                warn!(operation = %request, "Rejected: meaning overlay is add-only");
                Err(MeaningError::UnsupportedOperation {
                    operation: request.kind,
                    target: request.target,
                })
            }
        }
    }

    /// Caller must hold the write gate.
    fn commit_meaning(&self, entry: MeaningEntry, journal: bool) -> Result<Arc<MeaningEntry>, MeaningError> {
        let report = self.validator.check_meaning(&entry);
        if !report.is_valid() {
            return Err(reject("add_meaning", report));
        }

        if let Some(sink) = self.journal.as_ref().filter(|_| journal) {
            sink.append(&JournalRecord::Meaning(entry.clone()))?;
        }

        let entry = Arc::new(entry);
        self.write(|index| index.insert_meaning(Arc::clone(&entry)))?;
        info!(term = %entry.term, source = %entry.source, replayed = !journal, "Meaning added");
        Ok(entry)
    }

    /// Caller must hold the write gate.
    fn commit_annotation(&self, annotation: Annotation, journal: bool) -> Result<Arc<Annotation>, MeaningError> {
        let ledger = self.store.view()?;
        let known = match &annotation.target {
            AnnotationTarget::Incident(id) => ledger.contains(id),
            AnnotationTarget::Entity(id) => ledger.has_entity(id.as_str()),
        };
        if !known {
            let (kind, id) = match &annotation.target {
                AnnotationTarget::Incident(id) => ("incident", id.to_string()),
                AnnotationTarget::Entity(id) => ("entity", id.to_string()),
            };
            warn!(kind, id = %id, "Rejected: annotation target is not in the store");
            return Err(MeaningError::UnknownReference { kind, id });
        }

        if self.view()?.annotation(annotation.annotation_id).is_some() {
            warn!(annotation_id = %annotation.annotation_id, "Rejected: annotation id already stored");
            return Err(MeaningError::DuplicateAnnotation(annotation.annotation_id));
        }

        let report = self.validator.check_annotation(&annotation);
        if !report.is_valid() {
            return Err(reject("annotate", report));
        }

        if let Some(sink) = self.journal.as_ref().filter(|_| journal) {
            sink.append(&JournalRecord::Annotation(annotation.clone()))?;
        }

        let annotation = Arc::new(annotation);
        self.write(|index| index.insert_annotation(Arc::clone(&annotation)))?;
        info!(
            annotation_id = %annotation.annotation_id,
            target = %annotation.target,
            term = %annotation.term,
            replayed = !journal,
            "Annotation created"
        );
        Ok(annotation)
    }

    fn write(&self, apply: impl FnOnce(&mut OverlayIndex)) -> Result<(), MeaningError> {
        let Ok(mut state) = self.state.write() else {
            return Err(MeaningError::LockPoisoned("meaning overlay state"));
        };
        apply(Arc::make_mut(&mut state));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read shortcuts
    // -----------------------------------------------------------------------

    /// Entries for `term` across all sources, in insertion order.
    pub fn get_meanings_for_term(&self, term: &str) -> Result<Vec<Arc<MeaningEntry>>, MeaningError> {
        Ok(self.view()?.meanings_for_term(term).cloned().collect())
    }

    /// Distinct normalized terms.
    pub fn terms(&self) -> Result<Vec<String>, MeaningError> {
        Ok(self.view()?.terms().map(str::to_owned).collect())
    }

    /// Every entry, in insertion order.
    pub fn entries(&self) -> Result<Vec<Arc<MeaningEntry>>, MeaningError> {
        Ok(self.view()?.entries().cloned().collect())
    }

    /// Entries from one source.
    pub fn entries_for_source(&self, source: MeaningSource) -> Result<Vec<Arc<MeaningEntry>>, MeaningError> {
        Ok(self.view()?.entries_for_source(source).cloned().collect())
    }

    /// Every link, in creation order.
    pub fn annotations(&self) -> Result<Vec<Arc<Annotation>>, MeaningError> {
        Ok(self.view()?.annotations().cloned().collect())
    }

    /// Links attached to an incident.
    pub fn annotations_for_incident(&self, incident_id: &str) -> Result<Vec<Arc<Annotation>>, MeaningError> {
        Ok(self.view()?.annotations_for_incident(incident_id).cloned().collect())
    }

    /// Links attached directly to an entity.
    pub fn annotations_for_entity(&self, entity_id: &str) -> Result<Vec<Arc<Annotation>>, MeaningError> {
        Ok(self.view()?.annotations_for_entity(entity_id).cloned().collect())
    }
}

fn link(target: AnnotationTarget, term: impl Into<String>, meaning: MeaningEntry) -> Annotation {
    Annotation {
        annotation_id: AnnotationId::new(),
        target,
        term: term.into(),
        meaning,
        created_at: Utc::now(),
    }
}

/// Structural problems win over content problems.
fn reject(action: &str, report: ValidationReport) -> MeaningError {
    log_rejection(action, &report);
    let structural: Vec<&str> = report
        .by_rule(RuleId::Integrity)
        .map(|v| v.reason.as_str())
        .collect();
    if structural.is_empty() {
        MeaningError::Validation(report)
    } else {
        MeaningError::InvalidMeaning {
            reason: structural.join("; "),
        }
    }
}
