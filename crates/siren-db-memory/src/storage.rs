use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use siren_core::{AmbulanceUnit, Incident};
use siren_storage::{DispatchStore, StorageError, Versioned};

/// In-memory dispatch storage backend.
///
/// Collections are `Vec`s guarded by an async `RwLock`, so list order is
/// insertion order — the stable ordering the assignment engine's tie-break
/// relies on. Revisions come from a process-wide atomic counter.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    units: Arc<RwLock<Vec<Versioned<AmbulanceUnit>>>>,
    incidents: Arc<RwLock<Vec<Versioned<Incident>>>>,
    revision_counter: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the unit collection, e.g. at bootstrap or in tests.
    pub async fn seed_units(&self, units: Vec<AmbulanceUnit>) {
        let mut guard = self.units.write().await;
        for unit in units {
            let rev = self.next_revision();
            guard.push(Versioned::new(unit, rev));
        }
    }

    fn next_revision(&self) -> u64 {
        self.revision_counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Compare-and-swap write into a versioned collection. Shared with the file
/// backend, which layers persistence on top of the same semantics.
pub(crate) fn put_entity<T: Clone>(
    entries: &mut Vec<Versioned<T>>,
    entity: &T,
    id_of: impl Fn(&T) -> &str,
    id: &str,
    kind: &'static str,
    expected: Option<u64>,
    new_revision: u64,
) -> Result<u64, StorageError> {
    let existing = entries.iter_mut().find(|e| id_of(&e.value) == id);
    match (existing, expected) {
        (Some(entry), Some(rev)) => {
            if entry.revision != rev {
                return Err(StorageError::revision_conflict(kind, id));
            }
            entry.value = entity.clone();
            entry.revision = new_revision;
            Ok(new_revision)
        }
        (Some(_), None) => Err(StorageError::already_exists(kind, id)),
        (None, Some(_)) => Err(StorageError::revision_conflict(kind, id)),
        (None, None) => {
            entries.push(Versioned::new(entity.clone(), new_revision));
            Ok(new_revision)
        }
    }
}

#[async_trait]
impl DispatchStore for InMemoryStore {
    async fn list_units(&self) -> Result<Vec<Versioned<AmbulanceUnit>>, StorageError> {
        Ok(self.units.read().await.clone())
    }

    async fn get_unit(&self, id: &str) -> Result<Option<Versioned<AmbulanceUnit>>, StorageError> {
        let guard = self.units.read().await;
        Ok(guard.iter().find(|u| u.value.ambulance_id == id).cloned())
    }

    async fn put_unit(
        &self,
        unit: &AmbulanceUnit,
        expected: Option<u64>,
    ) -> Result<u64, StorageError> {
        let rev = self.next_revision();
        let mut guard = self.units.write().await;
        put_entity(
            &mut guard,
            unit,
            |u| &u.ambulance_id,
            &unit.ambulance_id,
            "AmbulanceUnit",
            expected,
            rev,
        )
    }

    async fn list_incidents(&self) -> Result<Vec<Versioned<Incident>>, StorageError> {
        Ok(self.incidents.read().await.clone())
    }

    async fn get_incident(
        &self,
        id: &str,
    ) -> Result<Option<Versioned<Incident>>, StorageError> {
        let guard = self.incidents.read().await;
        Ok(guard.iter().find(|i| i.value.incident_id == id).cloned())
    }

    async fn put_incident(
        &self,
        incident: &Incident,
        expected: Option<u64>,
    ) -> Result<u64, StorageError> {
        let rev = self.next_revision();
        let mut guard = self.incidents.write().await;
        put_entity(
            &mut guard,
            incident,
            |i| &i.incident_id,
            &incident.incident_id,
            "Incident",
            expected,
            rev,
        )
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
