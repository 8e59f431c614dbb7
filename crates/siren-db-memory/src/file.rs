//! JSON-file-backed dispatch storage.
//!
//! One JSON array per collection (`units.json`, `incidents.json`) in a data
//! directory. The whole collection is loaded at open and rewritten after
//! every successful put; revisions live in memory only and restart from the
//! loaded state. Suited to the system's single-process scale — the
//! compare-and-swap check happens under the same lock as the file rewrite.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use siren_core::{AmbulanceUnit, Incident};
use siren_storage::{DispatchStore, StorageError, Versioned};

use crate::storage::put_entity;

pub struct JsonFileStore {
    units_path: PathBuf,
    incidents_path: PathBuf,
    units: RwLock<Vec<Versioned<AmbulanceUnit>>>,
    incidents: RwLock<Vec<Versioned<Incident>>>,
    revision_counter: AtomicU64,
}

impl JsonFileStore {
    /// Open (or initialize) a store rooted at `data_dir`. Missing files are
    /// treated as empty collections.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;

        let units_path = data_dir.join("units.json");
        let incidents_path = data_dir.join("incidents.json");

        let counter = AtomicU64::new(0);
        let units = load_collection::<AmbulanceUnit>(&units_path, &counter).await?;
        let incidents = load_collection::<Incident>(&incidents_path, &counter).await?;

        tracing::info!(
            path = %data_dir.display(),
            units = units.len(),
            incidents = incidents.len(),
            "Opened JSON file store"
        );

        Ok(Self {
            units_path,
            incidents_path,
            units: RwLock::new(units),
            incidents: RwLock::new(incidents),
            revision_counter: counter,
        })
    }

    fn next_revision(&self) -> u64 {
        self.revision_counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Read a collection file into versioned entries, assigning fresh revisions.
async fn load_collection<T: DeserializeOwned>(
    path: &Path,
    counter: &AtomicU64,
) -> Result<Vec<Versioned<T>>, StorageError> {
    let raw = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let values: Vec<T> = serde_json::from_slice(&raw)?;
    Ok(values
        .into_iter()
        .map(|v| Versioned::new(v, counter.fetch_add(1, Ordering::SeqCst) + 1))
        .collect())
}

/// Rewrite a collection file from the in-memory entries.
async fn persist_collection<T: Serialize>(
    path: &Path,
    entries: &[Versioned<T>],
) -> Result<(), StorageError> {
    let values: Vec<&T> = entries.iter().map(|e| &e.value).collect();
    let json = serde_json::to_vec_pretty(&values)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[async_trait]
impl DispatchStore for JsonFileStore {
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
        // Mutate a staged copy; memory only advances once the file write
        // succeeded, so a failed put leaves both sides unchanged.
        let mut staged = guard.clone();
        let rev = put_entity(
            &mut staged,
            unit,
            |u| &u.ambulance_id,
            &unit.ambulance_id,
            "AmbulanceUnit",
            expected,
            rev,
        )?;
        persist_collection(&self.units_path, &staged).await?;
        *guard = staged;
        Ok(rev)
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
        let mut staged = guard.clone();
        let rev = put_entity(
            &mut staged,
            incident,
            |i| &i.incident_id,
            &incident.incident_id,
            "Incident",
            expected,
            rev,
        )?;
        persist_collection(&self.incidents_path, &staged).await?;
        *guard = staged;
        Ok(rev)
    }

    fn backend_name(&self) -> &'static str {
        "json-file"
    }
}
