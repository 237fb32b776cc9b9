//! Generation and caching of snapshots.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use witness_ledger::{IncidentStore, LedgerView};
use witness_meaning::{MeaningOverlay, OverlayView};
use witness_types::{Snapshot, SnapshotBody, SnapshotId};
use witness_validator::Validator;

use crate::{SnapshotError, project};

/// Builds snapshot views and keeps them in a transient cache.
#[derive(Debug)]
pub struct SnapshotGenerator {
    store: Arc<IncidentStore>,
    overlay: Arc<MeaningOverlay>,
    cache: RwLock<BTreeMap<SnapshotId, Arc<Snapshot>>>,
}

impl SnapshotGenerator {
    /// Create a generator with an empty cache.
    pub const fn new(store: Arc<IncidentStore>, overlay: Arc<MeaningOverlay>) -> Self {
        Self {
            store,
            overlay,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// One consistent read of store and overlay.
    ///
    /// Holding the write gate while both views are taken means no append or
    /// overlay write can land between them.
    fn read(&self) -> Result<(LedgerView, OverlayView), SnapshotError> {
        let _gate = self.store.write_gate()?;
        Ok((self.store.view()?, self.overlay.view()?))
    }

    fn validator(&self) -> &Validator {
        self.store.validator()
    }

    fn publish(&self, body: SnapshotBody) -> Result<Arc<Snapshot>, SnapshotError> {
        let snapshot = Snapshot::new(body);
        let report = self.validator().check_snapshot(&snapshot);
        if !report.is_valid() {
            for v in &report.violations {
                error!(
                    snapshot_id = %snapshot.snapshot_id,
                    kind = ?snapshot.kind(),
                    rule = %v.rule,
                    field = %v.field,
                    "Generated snapshot failed checks: {}",
                    v.reason
                );
            }
            return Err(SnapshotError::Validation(report));
        }

        let snapshot = Arc::new(snapshot);
        let Ok(mut cache) = self.cache.write() else {
            return Err(SnapshotError::LockPoisoned("snapshot cache"));
        };
        cache.insert(snapshot.snapshot_id, Arc::clone(&snapshot));
        info!(
            snapshot_id = %snapshot.snapshot_id,
            kind = ?snapshot.kind(),
            cached = cache.len(),
            "Snapshot generated"
        );
        Ok(snapshot)
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    /// Derived identity of `entity` plus its meanings.
    pub fn create_identity_snapshot(&self, entity: &str) -> Result<Arc<Snapshot>, SnapshotError> {
        let (ledger, overlay) = self.read()?;
        self.publish(SnapshotBody::Identity(project::identity(&ledger, &overlay, entity)))
    }

    /// The entity's incidents in date order, with their annotations.
    pub fn create_timeline_snapshot(&self, entity: &str) -> Result<Arc<Snapshot>, SnapshotError> {
        let (ledger, overlay) = self.read()?;
        self.publish(SnapshotBody::Timeline(project::timeline(&ledger, &overlay, entity)))
    }

    /// Every incident of `system` with per-entity summaries.
    pub fn create_system_snapshot(&self, system: &str) -> Result<Arc<Snapshot>, SnapshotError> {
        let (ledger, _) = self.read()?;
        self.publish(SnapshotBody::System(project::system(&ledger, system)))
    }

    /// Incidents shared by two entities.
    pub fn create_relationship_snapshot(
        &self,
        entity1: &str,
        entity2: &str,
    ) -> Result<Arc<Snapshot>, SnapshotError> {
        let (ledger, _) = self.read()?;
        self.publish(SnapshotBody::Relationship(project::relationship(
            &ledger, entity1, entity2,
        )))
    }

    /// Incidents dated within `[start, end]`. An inverted range is empty.
    pub fn create_temporal_snapshot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Arc<Snapshot>, SnapshotError> {
        let (ledger, _) = self.read()?;
        self.publish(SnapshotBody::Temporal(project::temporal(&ledger, start, end)))
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    /// A cached snapshot.
    pub fn get_snapshot(&self, id: SnapshotId) -> Result<Option<Arc<Snapshot>>, SnapshotError> {
        let Ok(cache) = self.cache.read() else {
            return Err(SnapshotError::LockPoisoned("snapshot cache"));
        };
        Ok(cache.get(&id).cloned())
    }

    /// Every cached snapshot, oldest first.
    pub fn snapshots(&self) -> Result<Vec<Arc<Snapshot>>, SnapshotError> {
        let Ok(cache) = self.cache.read() else {
            return Err(SnapshotError::LockPoisoned("snapshot cache"));
        };
        Ok(cache.values().cloned().collect())
    }

    /// Drop a snapshot from the cache. Returns whether it was there.
    pub fn delete_snapshot(&self, id: SnapshotId) -> Result<bool, SnapshotError> {
        let Ok(mut cache) = self.cache.write() else {
            return Err(SnapshotError::LockPoisoned("snapshot cache"));
        };
        let removed = cache.remove(&id).is_some();
        debug!(snapshot_id = %id, removed, "Snapshot deleted");
        Ok(removed)
    }

    /// Empty the cache.
    pub fn clear(&self) -> Result<(), SnapshotError> {
        let Ok(mut cache) = self.cache.write() else {
            return Err(SnapshotError::LockPoisoned("snapshot cache"));
        };
        let dropped = cache.len();
        cache.clear();
        debug!(dropped, "Snapshot cache cleared");
        Ok(())
    }
}
