//! Read-through, invalidate-on-write wrapper around the dispatch store.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use siren_core::{AmbulanceUnit, Incident};
use siren_storage::{DispatchStore, StorageError, Versioned};

use super::backend::CacheBackend;

const KEY_UNITS_ALL: &str = "units:all";
const KEY_INCIDENTS_ALL: &str = "incidents:all";

fn reporter_key(user_id: &str) -> String {
    format!("incidents:reporter:{user_id}")
}

/// Cache-aside layer over a [`DispatchStore`].
///
/// Collection reads are served from the cache when possible, encoded with
/// MessagePack. Writes always go to the store first and then delete the
/// affected keys. With `cache: None` every read is a miss and every
/// invalidation a no-op, so functional behavior is identical either way.
#[derive(Clone)]
pub struct CachedStore {
    store: Arc<dyn DispatchStore>,
    cache: Option<CacheBackend>,
    ttl: Duration,
}

impl CachedStore {
    pub fn new(store: Arc<dyn DispatchStore>, cache: Option<CacheBackend>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub fn store(&self) -> &Arc<dyn DispatchStore> {
        &self.store
    }

    async fn cached_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        let bytes = cache.get(key).await?;
        match rmp_serde::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                // A corrupt entry must not poison reads; drop it and re-fetch.
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                cache.invalidate(key).await;
                None
            }
        }
    }

    async fn cached_set<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        match rmp_serde::to_vec(value) {
            Ok(bytes) => cache.set(key, bytes, self.ttl).await,
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to encode cache entry"),
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Some(cache) = self.cache.as_ref() {
            cache.invalidate(key).await;
        }
    }

    // ==================== Ambulance units ====================

    /// All units, in stable collection order.
    pub async fn list_units(&self) -> Result<Vec<AmbulanceUnit>, StorageError> {
        if let Some(units) = self.cached_get::<Vec<AmbulanceUnit>>(KEY_UNITS_ALL).await {
            return Ok(units);
        }
        let units: Vec<AmbulanceUnit> = self
            .store
            .list_units()
            .await?
            .into_iter()
            .map(Versioned::into_value)
            .collect();
        self.cached_set(KEY_UNITS_ALL, &units).await;
        Ok(units)
    }

    /// Always hits the store: callers need the current revision for CAS.
    pub async fn get_unit(&self, id: &str) -> Result<Option<Versioned<AmbulanceUnit>>, StorageError> {
        self.store.get_unit(id).await
    }

    pub async fn put_unit(
        &self,
        unit: &AmbulanceUnit,
        expected: Option<u64>,
    ) -> Result<u64, StorageError> {
        let revision = self.store.put_unit(unit, expected).await?;
        self.invalidate(KEY_UNITS_ALL).await;
        Ok(revision)
    }

    // ==================== Incidents ====================

    /// All incidents, in stable collection order.
    pub async fn list_incidents(&self) -> Result<Vec<Incident>, StorageError> {
        if let Some(incidents) = self.cached_get::<Vec<Incident>>(KEY_INCIDENTS_ALL).await {
            return Ok(incidents);
        }
        let incidents: Vec<Incident> = self
            .store
            .list_incidents()
            .await?
            .into_iter()
            .map(Versioned::into_value)
            .collect();
        self.cached_set(KEY_INCIDENTS_ALL, &incidents).await;
        Ok(incidents)
    }

    /// Always hits the store: callers need the current revision for CAS.
    pub async fn get_incident(&self, id: &str) -> Result<Option<Versioned<Incident>>, StorageError> {
        self.store.get_incident(id).await
    }

    pub async fn put_incident(
        &self,
        incident: &Incident,
        expected: Option<u64>,
    ) -> Result<u64, StorageError> {
        let revision = self.store.put_incident(incident, expected).await?;
        self.invalidate(KEY_INCIDENTS_ALL).await;
        self.invalidate(&reporter_key(&incident.user_id)).await;
        Ok(revision)
    }

    /// A reporter's incidents, newest first, cached per reporter.
    pub async fn incidents_for_reporter(
        &self,
        user_id: &str,
    ) -> Result<Vec<Incident>, StorageError> {
        let key = reporter_key(user_id);
        if let Some(incidents) = self.cached_get::<Vec<Incident>>(&key).await {
            return Ok(incidents);
        }
        let mut incidents: Vec<Incident> = self
            .store
            .list_incidents()
            .await?
            .into_iter()
            .map(Versioned::into_value)
            .filter(|i| i.user_id == user_id)
            .collect();
        incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.cached_set(&key, &incidents).await;
        Ok(incidents)
    }
}
