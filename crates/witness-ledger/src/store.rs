//! The incident store: an append-only sequence of validated incidents.
//!
//! # Design
//!
//! - **Append-only**: incidents are never modified or removed. There is no
//!   method to do so; requests for it are refused through [`execute`].
//! - **Single writer**: appends serialize on a write gate. The meaning
//!   overlay takes the same gate, so its writes interleave with appends
//!   one at a time.
//! - **Consistent reads**: readers take a [`LedgerView`], which shares the
//!   indexes as of one moment and is never changed afterwards.
//! - **Write-ahead**: an accepted incident reaches the journal before it
//!   becomes visible. If the journal refuses it, the store is unchanged.
//!
//! [`execute`]: IncidentStore::execute

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{info, warn};

use witness_types::{
    EntityId, Incident, IncidentId, JournalRecord, OperationKind, OperationRequest,
    OperationTarget,
};
use witness_validator::{Validator, log_rejection};

use crate::view::{Index, LedgerView};
use crate::{EntityIdentity, Journal, LedgerError};

// ---------------------------------------------------------------------------
// Operation requests
// ---------------------------------------------------------------------------

/// An operation requested by a layer that speaks in operation kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOperation {
    /// Append a new incident.
    Append(Incident),
    /// Change one field of a committed incident.
    Modify {
        /// The incident to change.
        incident_id: IncidentId,
        /// Name of the field.
        field: String,
        /// Replacement value.
        value: Value,
    },
    /// Remove a committed incident.
    Delete {
        /// The incident to remove.
        incident_id: IncidentId,
    },
    /// Replace a committed incident wholesale.
    Overwrite {
        /// The incident to replace.
        incident_id: IncidentId,
        /// The replacement.
        incident: Incident,
    },
}

impl StoreOperation {
    /// Classify the operation for the append-only rule.
    pub fn request(&self) -> OperationRequest {
        let target = OperationTarget::IncidentStore;
        match self {
            Self::Append(incident) => {
                OperationRequest::new(OperationKind::Append, target).on(incident.incident_id.as_str())
            }
            Self::Modify { incident_id, .. } => {
                OperationRequest::new(OperationKind::Modify, target).on(incident_id.as_str())
            }
            Self::Delete { incident_id } => {
                OperationRequest::new(OperationKind::Delete, target).on(incident_id.as_str())
            }
            Self::Overwrite { incident_id, .. } => {
                OperationRequest::new(OperationKind::Overwrite, target).on(incident_id.as_str())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// IncidentStore
// ---------------------------------------------------------------------------

/// Authoritative, append-only store of incidents.
pub struct IncidentStore {
    gate: Mutex<()>,
    state: RwLock<Arc<Index>>,
    validator: Arc<Validator>,
    journal: Option<Arc<dyn Journal>>,
}

impl core::fmt::Debug for IncidentStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IncidentStore")
            .field("validator", &self.validator)
            .field("journaled", &self.journal.is_some())
            .finish_non_exhaustive()
    }
}

impl IncidentStore {
    /// Create an empty, unjournaled store.
    pub fn new(validator: Arc<Validator>) -> Self {
        Self {
            gate: Mutex::new(()),
            state: RwLock::new(Arc::new(Index::default())),
            validator,
            journal: None,
        }
    }

    /// Create an empty store that hands every accepted incident to `journal`.
    pub fn with_journal(validator: Arc<Validator>, journal: Arc<dyn Journal>) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new(validator)
        }
    }

    /// The validator appends run through.
    pub const fn validator(&self) -> &Arc<Validator> {
        &self.validator
    }

    /// The journal accepted records are handed to, if any.
    pub fn journal(&self) -> Option<&Arc<dyn Journal>> {
        self.journal.as_ref()
    }

    /// Take the write gate.
    ///
    /// Held for the duration of an append. The meaning overlay takes it for
    /// its own writes, and the snapshot generator takes it briefly to read
    /// store and overlay as one consistent pair.
    pub fn write_gate(&self) -> Result<MutexGuard<'_, ()>, LedgerError> {
        let Ok(guard) = self.gate.lock() else {
            return Err(LedgerError::LockPoisoned("incident store write gate"));
        };
        Ok(guard)
    }

    /// A consistent, point-in-time view.
    pub fn view(&self) -> Result<LedgerView, LedgerError> {
        let Ok(state) = self.state.read() else {
            return Err(LedgerError::LockPoisoned("incident store state"));
        };
        Ok(LedgerView::new(Arc::clone(&state)))
    }

    /// Validate and append an incident.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateId`] if the id is already committed.
    /// - [`LedgerError::Validation`] if any layer reports a violation.
    /// - [`LedgerError::Journal`] if the journal refuses the record.
    ///
    /// In every error case the store is unchanged.
    pub fn append(&self, incident: Incident) -> Result<Arc<Incident>, LedgerError> {
        let _gate = self.write_gate()?;
        self.commit(incident, true)
    }

    /// Re-append an incident read back from the journal.
    ///
    /// Runs the same validation as [`append`](Self::append) but does not
    /// journal the record again.
    pub fn replay(&self, incident: Incident) -> Result<Arc<Incident>, LedgerError> {
        let _gate = self.write_gate()?;
        self.commit(incident, false)
    }

    /// Caller must hold the write gate.
    fn commit(&self, incident: Incident, journal: bool) -> Result<Arc<Incident>, LedgerError> {
        let current = self.view()?;
        let report = self.validator.check_incident(&incident, current.ids());

        if current.contains(&incident.incident_id) || report.has_marker("duplicate_id") {
            warn!(
                incident_id = %incident.incident_id,
                "Rejected: incident id already committed"
            );
            return Err(LedgerError::DuplicateId(incident.incident_id));
        }
        if !report.is_valid() {
            log_rejection("append", &report);
            return Err(LedgerError::Validation(report));
        }
        // Release the shared index so the insert below does not copy it.
        drop(current);

        if let Some(sink) = self.journal.as_ref().filter(|_| journal) {
            sink.append(&JournalRecord::Incident(incident.clone()))?;
        }

        let incident = Arc::new(incident);
        {
            let Ok(mut state) = self.state.write() else {
                return Err(LedgerError::LockPoisoned("incident store state"));
            };
            Arc::make_mut(&mut state).insert(Arc::clone(&incident));
        }

        info!(
            incident_id = %incident.incident_id,
            system = %incident.system,
            participants = incident.participants.len(),
            replayed = !journal,
            "Incident appended"
        );
        Ok(incident)
    }

    /// Handle an operation request from an external layer.
    ///
    /// [`StoreOperation::Append`] is forwarded to [`append`](Self::append).
    /// Everything else is refused through the append-only rule and leaves
    /// the store untouched.
    pub fn execute(&self, operation: StoreOperation) -> Result<Arc<Incident>, LedgerError> {
        let request = operation.request();
        if let StoreOperation::Append(incident) = operation {
            return self.append(incident);
        }
        let report = self.validator.check_operation(&request);
        log_rejection("execute", &report);
        warn!(operation = %request, "Rejected: incident store is append-only");
        Err(LedgerError::UnsupportedOperation {
            operation: request.kind,
            target: request.target,
        })
    }

    /// Identity of `entity_id`, derived on every call.
    pub fn identity(&self, entity_id: impl Into<EntityId>) -> EntityIdentity<'_> {
        EntityIdentity::new(entity_id, self)
    }

    // -----------------------------------------------------------------------
    // Read shortcuts
    // -----------------------------------------------------------------------

    /// Every incident in append order. The handles are shared and read-only.
    pub fn get_all(&self) -> Result<Vec<Arc<Incident>>, LedgerError> {
        Ok(self.view()?.all().cloned().collect())
    }

    /// Incidents that include `entity`, in chronological order.
    pub fn get_by_entity(&self, entity: &str) -> Result<Vec<Arc<Incident>>, LedgerError> {
        Ok(self.view()?.by_entity(entity).cloned().collect())
    }

    /// Incidents tagged with `system`, in chronological order.
    pub fn get_by_system(&self, system: &str) -> Result<Vec<Arc<Incident>>, LedgerError> {
        Ok(self.view()?.by_system(system).cloned().collect())
    }

    /// Incidents dated within `[start, end]`, in chronological order.
    pub fn get_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Arc<Incident>>, LedgerError> {
        Ok(self.view()?.by_date_range(start, end).cloned().collect())
    }

    /// The incident with this id.
    pub fn get(&self, id: &IncidentId) -> Result<Option<Arc<Incident>>, LedgerError> {
        Ok(self.view()?.get(id).cloned())
    }

    /// Whether an incident with this id is committed.
    pub fn contains(&self, id: &IncidentId) -> Result<bool, LedgerError> {
        Ok(self.view()?.contains(id))
    }

    /// Number of committed incidents.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.view()?.len())
    }

    /// Whether no incident is committed.
    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.view()?.is_empty())
    }

    /// Distinct systems.
    pub fn systems(&self) -> Result<BTreeSet<String>, LedgerError> {
        Ok(self.view()?.systems())
    }

    /// Distinct entities.
    pub fn entities(&self) -> Result<BTreeSet<EntityId>, LedgerError> {
        Ok(self.view()?.entities())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;
    use serde_json::json;
    use witness_validator::ValidatorConfig;

    use super::*;
    use crate::{IncidentBuilder, JournalError};

    fn validator() -> Arc<Validator> {
        Arc::new(Validator::new(ValidatorConfig::default()).unwrap())
    }

    fn incident(id: &str, fact: &str) -> Incident {
        IncidentBuilder::new(id, "mail")
            .date(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
            .participants(["a", "b"])
            .fact(fact)
            .build()
            .unwrap()
    }

    #[derive(Default)]
    struct CountingJournal {
        records: AtomicUsize,
        fail: bool,
    }

    impl Journal for CountingJournal {
        fn append(&self, _record: &JournalRecord) -> Result<(), JournalError> {
            if self.fail {
                return Err(JournalError::LockPoisoned);
            }
            self.records.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn append_then_read_back() {
        let store = IncidentStore::new(validator());
        assert!(store.is_empty().unwrap());
        store.append(incident("i1", "a sent a letter to b")).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.contains(&IncidentId::new("i1")).unwrap());
        assert_eq!(store.get_by_entity("b").unwrap().len(), 1);
        assert_eq!(store.get_by_system("mail").unwrap().len(), 1);
    }

    #[test]
    fn duplicate_is_rejected_and_store_unchanged() {
        let store = IncidentStore::new(validator());
        store.append(incident("i1", "a sent a letter to b")).unwrap();
        let result = store.append(incident("i1", "b replied"));
        assert!(matches!(result, Err(LedgerError::DuplicateId(_))));
        assert_eq!(store.len().unwrap(), 1);
        let kept = store.get(&IncidentId::new("i1")).unwrap().unwrap();
        assert_eq!(kept.facts, vec!["a sent a letter to b"]);
    }

    #[test]
    fn prediction_is_rejected() {
        let store = IncidentStore::new(validator());
        let result = store.append(incident("i1", "a will meet b tomorrow"));
        let report = match result {
            Err(LedgerError::Validation(report)) => Some(report),
            _ => None,
        };
        assert!(report.is_some_and(|r| r.has_marker("will")));
        assert!(store.is_empty().unwrap());
        assert!(store.append(incident("i2", "a met b yesterday")).is_ok());
    }

    #[test]
    fn history_altering_operations_are_refused() {
        let store = IncidentStore::new(validator());
        store.append(incident("i1", "a sent a letter to b")).unwrap();
        let before = store.get_all().unwrap();

        let operations = [
            StoreOperation::Modify {
                incident_id: IncidentId::new("i1"),
                field: "facts".to_owned(),
                value: json!(["nothing happened"]),
            },
            StoreOperation::Delete {
                incident_id: IncidentId::new("i1"),
            },
            StoreOperation::Overwrite {
                incident_id: IncidentId::new("i1"),
                incident: incident("i1", "b sent a letter to a"),
            },
        ];
        for op in operations {
            let result = store.execute(op);
            assert!(matches!(result, Err(LedgerError::UnsupportedOperation { .. })));
        }
        assert_eq!(store.get_all().unwrap(), before);
    }

    #[test]
    fn append_operation_is_forwarded() {
        let store = IncidentStore::new(validator());
        let result = store.execute(StoreOperation::Append(incident("i1", "a waved")));
        assert!(result.is_ok());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn views_do_not_see_later_appends() {
        let store = IncidentStore::new(validator());
        store.append(incident("i1", "a waved")).unwrap();
        let view = store.view().unwrap();
        store.append(incident("i2", "b waved")).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn accepted_incidents_are_journaled() {
        let journal = Arc::new(CountingJournal::default());
        let store = IncidentStore::with_journal(validator(), journal.clone());
        store.append(incident("i1", "a waved")).unwrap();
        let _ = store.append(incident("i1", "a waved again"));
        store.replay(incident("i2", "b waved")).unwrap();
        assert_eq!(journal.records.load(Ordering::SeqCst), 1);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn journal_failure_leaves_store_unchanged() {
        let journal = Arc::new(CountingJournal {
            records: AtomicUsize::new(0),
            fail: true,
        });
        let store = IncidentStore::with_journal(validator(), journal);
        let result = store.append(incident("i1", "a waved"));
        assert!(matches!(result, Err(LedgerError::Journal(_))));
        assert!(store.is_empty().unwrap());
    }
}
