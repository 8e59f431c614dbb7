//! Storage traits for the dispatch persistence abstraction.

use async_trait::async_trait;

use siren_core::{AmbulanceUnit, Incident};

use crate::error::StorageError;
use crate::types::Versioned;

/// The persistence port all dispatch storage backends implement.
///
/// Reads and writes are per entity. Writes carry the revision the entity was
/// read at (`expected = Some(rev)`) for compare-and-swap semantics, or
/// `expected = None` to create a new entity. Implementations must be
/// thread-safe (`Send + Sync`).
///
/// # Errors
///
/// `put_*` returns `StorageError::RevisionConflict` when the stored revision
/// no longer matches `expected`, and `StorageError::AlreadyExists` when a
/// create hits an existing id. Reads fail only on infrastructure problems,
/// never for missing entities.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    // ==================== Ambulance units ====================

    /// Lists all units in stable collection order.
    async fn list_units(&self) -> Result<Vec<Versioned<AmbulanceUnit>>, StorageError>;

    /// Reads a unit by id. Returns `None` if it does not exist.
    async fn get_unit(&self, id: &str) -> Result<Option<Versioned<AmbulanceUnit>>, StorageError>;

    /// Writes a unit, returning the new revision.
    async fn put_unit(
        &self,
        unit: &AmbulanceUnit,
        expected: Option<u64>,
    ) -> Result<u64, StorageError>;

    // ==================== Incidents ====================

    /// Lists all incidents in stable collection order.
    async fn list_incidents(&self) -> Result<Vec<Versioned<Incident>>, StorageError>;

    /// Reads an incident by id. Returns `None` if it does not exist.
    async fn get_incident(&self, id: &str)
    -> Result<Option<Versioned<Incident>>, StorageError>;

    /// Writes an incident, returning the new revision.
    async fn put_incident(
        &self,
        incident: &Incident,
        expected: Option<u64>,
    ) -> Result<u64, StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
