//! Incident lifecycle: accept, status updates, live location updates.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use siren_core::{DispatchError, GeoPoint, Incident, IncidentStatus, TransitionPolicy, time::now_utc};
use siren_storage::Versioned;

use crate::broker::{TrackingBroker, TrackingEvent};
use crate::cache::CachedStore;

/// A driver taking ownership of a dispatched incident.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptRequest {
    pub incident_id: String,
    pub ambulance_driver_name: String,
    pub ambulance_driver_phone: String,
}

/// A driver reporting a lifecycle status change.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    pub incident_id: String,
    pub new_status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A live position report from the assigned ambulance.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationUpdateRequest {
    pub incident_id: String,
    pub ambulance_id: String,
    pub location: GeoPoint,
}

/// Drives an incident through its lifecycle and fans updates out to the
/// tracking streams.
pub struct LifecycleService {
    store: CachedStore,
    broker: Arc<TrackingBroker>,
    policy: TransitionPolicy,
}

impl LifecycleService {
    pub fn new(store: CachedStore, broker: Arc<TrackingBroker>, policy: TransitionPolicy) -> Self {
        Self { store, broker, policy }
    }

    async fn load_incident(&self, id: &str) -> Result<Versioned<Incident>, DispatchError> {
        self.store
            .get_incident(id)
            .await?
            .ok_or_else(|| DispatchError::incident_not_found(id))
    }

    /// A driver accepts the incident. Legal only before anyone has accepted
    /// it; sets the driver identity and stamps `accepted_at`.
    pub async fn accept_incident(&self, req: AcceptRequest) -> Result<Incident, DispatchError> {
        if req.ambulance_driver_name.trim().is_empty() {
            return Err(DispatchError::validation("ambulance_driver_name is required"));
        }
        if req.ambulance_driver_phone.trim().is_empty() {
            return Err(DispatchError::validation("ambulance_driver_phone is required"));
        }

        let current = self.load_incident(&req.incident_id).await?;
        let mut incident = current.value;

        if !incident.status.accepts_driver() {
            return Err(DispatchError::invalid_transition(
                incident.status.as_label(),
                IncidentStatus::Dispatched.as_label(),
            ));
        }

        let at = now_utc();
        incident.ambulance_driver_name = Some(req.ambulance_driver_name);
        incident.ambulance_driver_phone = Some(req.ambulance_driver_phone);
        incident.accepted_at = Some(at);
        incident.record_status(IncidentStatus::Dispatched, "ambulance_driver", None, at);

        self.store
            .put_incident(&incident, Some(current.revision))
            .await?;

        tracing::info!(
            incident_id = %incident.incident_id,
            driver = incident.ambulance_driver_name.as_deref().unwrap_or(""),
            "Incident accepted"
        );

        self.broker.publish(
            &incident.incident_id,
            &TrackingEvent::new(
                "incident_accepted",
                json!({
                    "incident_id": incident.incident_id,
                    "status": incident.status,
                    "ambulance_driver_name": incident.ambulance_driver_name,
                    "ambulance_driver_phone": incident.ambulance_driver_phone,
                    "accepted_at": incident.accepted_at,
                }),
            ),
        );

        Ok(incident)
    }

    /// Record a status change reported by the driver.
    ///
    /// A terminal status additionally releases the assigned unit; a missing
    /// unit is logged and the transition still succeeds.
    pub async fn update_status(&self, req: StatusUpdateRequest) -> Result<Incident, DispatchError> {
        let new_status: IncidentStatus = req.new_status.parse()?;
        if !new_status.is_updatable_target() {
            return Err(DispatchError::validation(format!(
                "Cannot update an incident to {new_status}"
            )));
        }

        let current = self.load_incident(&req.incident_id).await?;
        let mut incident = current.value;

        self.policy.check(incident.status, new_status)?;

        let at = now_utc();
        incident.record_status(new_status, "ambulance_driver", req.notes.clone(), at);

        self.store
            .put_incident(&incident, Some(current.revision))
            .await?;

        tracing::info!(
            incident_id = %incident.incident_id,
            status = %new_status,
            "Incident status updated"
        );

        self.broker.publish(
            &incident.incident_id,
            &TrackingEvent::new(
                "status_update",
                json!({
                    "incident_id": incident.incident_id,
                    "status": new_status,
                    "timestamp": at,
                    "notes": req.notes.unwrap_or_default(),
                }),
            ),
        );

        if new_status.is_terminal() {
            self.release_unit(&incident.ambulance_id, &incident.incident_id)
                .await;
        }

        Ok(incident)
    }

    /// Free the unit bound to a terminated incident.
    async fn release_unit(&self, ambulance_id: &str, incident_id: &str) {
        let result = async {
            let Some(current) = self.store.get_unit(ambulance_id).await? else {
                tracing::warn!(
                    ambulance_id = %ambulance_id,
                    incident_id = %incident_id,
                    "Assigned unit not found at release"
                );
                return Ok::<_, DispatchError>(());
            };
            let mut unit = current.value;
            unit.engaged = false;
            self.store.put_unit(&unit, Some(current.revision)).await?;
            tracing::info!(ambulance_id = %ambulance_id, "Unit released");
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(
                ambulance_id = %ambulance_id,
                incident_id = %incident_id,
                error = %e,
                "Failed to release unit"
            );
        }
    }

    /// Apply a live position report and rebroadcast the derived tracking data.
    ///
    /// The incident must match both the incident id and the reporting unit's
    /// id; anything else is treated as not found so a stale or foreign driver
    /// app cannot move another incident's ambulance.
    pub async fn update_location(
        &self,
        req: LocationUpdateRequest,
    ) -> Result<Incident, DispatchError> {
        if !req.location.is_finite() {
            return Err(DispatchError::validation("location must be finite coordinates"));
        }

        let current = self.load_incident(&req.incident_id).await?;
        let mut incident = current.value;

        if incident.ambulance_id != req.ambulance_id {
            return Err(DispatchError::incident_not_found(&req.incident_id));
        }

        let at = now_utc();
        incident.apply_location(req.location, at);

        self.store
            .put_incident(&incident, Some(current.revision))
            .await?;

        self.broker.publish(
            &incident.incident_id,
            &TrackingEvent::new(
                "location_update",
                json!({
                    "incident_id": incident.incident_id,
                    "current_ambulance_location": incident.current_ambulance_location,
                    "distance_km": incident.distance_km,
                    "eta_minutes": incident.eta_minutes,
                }),
            ),
        );

        Ok(incident)
    }
}
