//! Read-only tracking projections over the incident store.

use serde::Serialize;
use siren_core::{
    AmbulanceLocation, DispatchError, GeoPoint, Incident, IncidentStatus, StatusHistoryEntry,
};
use time::OffsetDateTime;

use crate::cache::CachedStore;

/// Tracking-relevant projection of one incident, served over the live
/// tracking endpoint and as the attach snapshot on the SSE stream.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingSnapshot {
    pub incident_id: String,
    pub status: IncidentStatus,
    pub ambulance_id: String,
    pub ambulance_driver_name: Option<String>,
    pub ambulance_driver_phone: Option<String>,
    pub patient_location: GeoPoint,
    pub current_ambulance_location: Option<AmbulanceLocation>,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub hospital_name: String,
    pub created_at: OffsetDateTime,
    pub accepted_at: Option<OffsetDateTime>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub last_updated: OffsetDateTime,
}

impl From<Incident> for TrackingSnapshot {
    fn from(incident: Incident) -> Self {
        let last_updated = incident.last_updated();
        Self {
            incident_id: incident.incident_id,
            status: incident.status,
            ambulance_id: incident.ambulance_id,
            ambulance_driver_name: incident.ambulance_driver_name,
            ambulance_driver_phone: incident.ambulance_driver_phone,
            patient_location: incident.location,
            current_ambulance_location: incident.current_ambulance_location,
            distance_km: incident.distance_km,
            eta_minutes: incident.eta_minutes,
            hospital_name: incident.hospital_name,
            created_at: incident.created_at,
            accepted_at: incident.accepted_at,
            status_history: incident.status_history,
            last_updated,
        }
    }
}

/// Compact status projection for polling clients.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub incident_id: String,
    pub status: IncidentStatus,
    pub eta_minutes: u32,
    pub last_updated: OffsetDateTime,
}

/// Query service behind the tracking endpoints.
#[derive(Clone)]
pub struct TrackingService {
    store: CachedStore,
}

impl TrackingService {
    pub fn new(store: CachedStore) -> Self {
        Self { store }
    }

    async fn load(&self, incident_id: &str) -> Result<Incident, DispatchError> {
        Ok(self
            .store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| DispatchError::incident_not_found(incident_id))?
            .into_value())
    }

    pub async fn snapshot(&self, incident_id: &str) -> Result<TrackingSnapshot, DispatchError> {
        Ok(self.load(incident_id).await?.into())
    }

    pub async fn status(&self, incident_id: &str) -> Result<StatusSnapshot, DispatchError> {
        let incident = self.load(incident_id).await?;
        Ok(StatusSnapshot {
            last_updated: incident.last_updated(),
            incident_id: incident.incident_id,
            status: incident.status,
            eta_minutes: incident.eta_minutes,
        })
    }

    /// A reporter's incidents, newest first. An unknown reporter is not an
    /// error, just an empty list.
    pub async fn incidents_for_reporter(
        &self,
        user_id: &str,
    ) -> Result<Vec<Incident>, DispatchError> {
        Ok(self.store.incidents_for_reporter(user_id).await?)
    }

    /// A unit's open work queue: non-terminal incidents, newest first.
    pub async fn incidents_for_unit(
        &self,
        ambulance_id: &str,
    ) -> Result<Vec<Incident>, DispatchError> {
        let mut incidents: Vec<Incident> = self
            .store
            .list_incidents()
            .await?
            .into_iter()
            .filter(|i| i.ambulance_id == ambulance_id && !i.status.is_terminal())
            .collect();
        incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(incidents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::{NewIncident, time::now_utc};
    use siren_db_memory::InMemoryStore;
    use siren_storage::DispatchStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn incident(id: &str, user_id: &str, ambulance_id: &str) -> Incident {
        Incident::dispatched(NewIncident {
            incident_id: id.into(),
            user_id: user_id.into(),
            user_name: "Ravi".into(),
            user_email: "ravi@example.com".into(),
            emergency_type: "Cardiac".into(),
            location: GeoPoint::new(12.97, 77.59),
            hospital_name: "City General".into(),
            hospital_email: "dispatch@cg.example".into(),
            ambulance_id: ambulance_id.into(),
            distance_km: 2.5,
            eta_minutes: 8,
            created_at: now_utc(),
        })
    }

    async fn service(incidents: Vec<Incident>) -> TrackingService {
        let store = Arc::new(InMemoryStore::new());
        for i in &incidents {
            store.put_incident(i, None).await.unwrap();
        }
        TrackingService::new(CachedStore::new(store, None, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_snapshot_projects_tracking_fields() {
        let svc = service(vec![incident("INC-1", "42", "AMB-001")]).await;
        let snap = svc.snapshot("INC-1").await.unwrap();
        assert_eq!(snap.incident_id, "INC-1");
        assert_eq!(snap.hospital_name, "City General");
        assert_eq!(snap.patient_location, GeoPoint::new(12.97, 77.59));
        assert!(snap.current_ambulance_location.is_none());
        assert_eq!(snap.last_updated, snap.created_at);
        assert_eq!(snap.status_history.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_unknown_incident() {
        let svc = service(vec![]).await;
        let err = svc.snapshot("INC-404").await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_status_is_compact() {
        let svc = service(vec![incident("INC-1", "42", "AMB-001")]).await;
        let status = svc.status("INC-1").await.unwrap();
        assert_eq!(status.status, IncidentStatus::Dispatched);
        assert_eq!(status.eta_minutes, 8);
    }

    #[tokio::test]
    async fn test_reporter_incidents_newest_first() {
        let mut older = incident("INC-1", "42", "AMB-001");
        older.created_at = now_utc() - time::Duration::hours(1);
        let svc = service(vec![
            older,
            incident("INC-2", "42", "AMB-002"),
            incident("INC-3", "7", "AMB-003"),
        ])
        .await;

        let incidents = svc.incidents_for_reporter("42").await.unwrap();
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].incident_id, "INC-2");
        assert_eq!(incidents[1].incident_id, "INC-1");
    }

    #[tokio::test]
    async fn test_unknown_reporter_is_empty_success() {
        let svc = service(vec![incident("INC-1", "42", "AMB-001")]).await;
        assert!(svc.incidents_for_reporter("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unit_queue_skips_terminal() {
        let mut done = incident("INC-1", "42", "AMB-001");
        done.record_status(IncidentStatus::Completed, "ambulance_driver", None, now_utc());
        let svc = service(vec![done, incident("INC-2", "42", "AMB-001")]).await;

        let queue = svc.incidents_for_unit("AMB-001").await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].incident_id, "INC-2");
    }
}
