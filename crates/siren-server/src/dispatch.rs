//! Assignment engine: turns an emergency report into a dispatched incident.

use std::sync::Arc;

use rand::Rng;
use serde::Deserialize;
use siren_core::{
    AmbulanceUnit, DispatchError, GeoPoint, Incident, NewIncident, geo, id, time::now_utc,
};
use siren_notifications::{AlertNotifier, DispatchAlert};
use siren_storage::StorageError;

use crate::cache::CachedStore;

/// Attempts to win a unit before giving up on a dispatch.
const MAX_RESERVE_ATTEMPTS: usize = 3;

/// An incoming emergency report from a member of the public.
#[derive(Debug, Clone, Deserialize)]
pub struct EmergencyReport {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub emergency_type: String,
    pub location: GeoPoint,
}

impl EmergencyReport {
    fn validate(&self) -> Result<(), DispatchError> {
        for (field, value) in [
            ("user_id", &self.user_id),
            ("user_name", &self.user_name),
            ("user_email", &self.user_email),
            ("emergency_type", &self.emergency_type),
        ] {
            if value.trim().is_empty() {
                return Err(DispatchError::validation(format!("{field} is required")));
            }
        }
        if !self.location.is_finite() {
            return Err(DispatchError::validation("location must be finite coordinates"));
        }
        Ok(())
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub incident: Incident,
    /// Whether the hospital alert email went out. Delivery failure never
    /// fails the dispatch itself.
    pub alert_delivered: bool,
}

/// Picks the nearest free unit, reserves it, and opens the incident.
pub struct DispatchService {
    store: CachedStore,
    notifier: Arc<dyn AlertNotifier>,
}

impl DispatchService {
    pub fn new(store: CachedStore, notifier: Arc<dyn AlertNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Handle an emergency report end to end.
    ///
    /// Reservation uses compare-and-swap on the unit: losing the race to a
    /// concurrent dispatch re-runs the selection against fresh data, a
    /// bounded number of times.
    pub async fn dispatch(&self, report: EmergencyReport) -> Result<DispatchOutcome, DispatchError> {
        report.validate()?;

        let (unit, distance_km) = self.reserve_nearest_unit(report.location).await?;

        let created_at = now_utc();
        // The real ETA arrives with the first live location update; until
        // then use the original system's randomized placeholder.
        let eta_minutes = rand::thread_rng().gen_range(5..=15);

        let incident = Incident::dispatched(NewIncident {
            incident_id: id::generate_incident_id(),
            user_id: report.user_id,
            user_name: report.user_name,
            user_email: report.user_email,
            emergency_type: report.emergency_type,
            location: report.location,
            hospital_name: unit.name.clone(),
            hospital_email: unit.email.clone(),
            ambulance_id: unit.ambulance_id.clone(),
            distance_km: geo::round_km(distance_km),
            eta_minutes,
            created_at,
        });

        self.store.put_incident(&incident, None).await?;

        tracing::info!(
            incident_id = %incident.incident_id,
            ambulance_id = %incident.ambulance_id,
            distance_km = incident.distance_km,
            "Incident dispatched"
        );

        let alert_delivered = self.send_alert(&incident).await;

        Ok(DispatchOutcome {
            incident,
            alert_delivered,
        })
    }

    /// Select the nearest free unit and flip it to engaged.
    async fn reserve_nearest_unit(
        &self,
        location: GeoPoint,
    ) -> Result<(AmbulanceUnit, f64), DispatchError> {
        for attempt in 0..MAX_RESERVE_ATTEMPTS {
            let units = self.store.list_units().await?;
            if units.is_empty() {
                return Err(DispatchError::NoUnitsConfigured);
            }

            let Some((candidate, distance_km)) = nearest_free_unit(&units, location) else {
                return Err(DispatchError::NoAvailableUnit);
            };

            // Re-read for the current revision; the cached list carries none.
            let Some(current) = self.store.get_unit(&candidate.ambulance_id).await? else {
                tracing::warn!(ambulance_id = %candidate.ambulance_id, "Selected unit vanished, reselecting");
                continue;
            };
            if current.value.engaged {
                // Lost the race after the cached read.
                continue;
            }

            let mut engaged = current.value.clone();
            engaged.engaged = true;
            match self
                .store
                .put_unit(&engaged, Some(current.revision))
                .await
            {
                Ok(_) => return Ok((engaged, distance_km)),
                Err(StorageError::RevisionConflict { .. }) => {
                    tracing::debug!(
                        ambulance_id = %engaged.ambulance_id,
                        attempt,
                        "Lost unit reservation race, reselecting"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        // Free units existed on every attempt; we just kept losing the CAS
        // race. Distinct from NoAvailableUnit so clients know to retry.
        tracing::warn!(attempts = MAX_RESERVE_ATTEMPTS, "Unit reservation contention exhausted");
        Err(DispatchError::ReservationContention)
    }

    async fn send_alert(&self, incident: &Incident) -> bool {
        let alert = DispatchAlert {
            incident_id: incident.incident_id.clone(),
            emergency_type: incident.emergency_type.clone(),
            reporter_name: incident.user_name.clone(),
            reporter_email: incident.user_email.clone(),
            hospital_name: incident.hospital_name.clone(),
            hospital_email: incident.hospital_email.clone(),
            ambulance_id: incident.ambulance_id.clone(),
            location: incident.location,
            eta_minutes: incident.eta_minutes,
        };
        match self.notifier.send_dispatch_alert(&alert).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    incident_id = %incident.incident_id,
                    channel = self.notifier.name(),
                    error = %e,
                    "Dispatch alert delivery failed"
                );
                false
            }
        }
    }
}

/// Nearest unit among the free ones; ties break to the first in collection
/// order so selection is deterministic.
fn nearest_free_unit(
    units: &[AmbulanceUnit],
    location: GeoPoint,
) -> Option<(AmbulanceUnit, f64)> {
    let mut best: Option<(&AmbulanceUnit, f64)> = None;
    for unit in units.iter().filter(|u| !u.engaged) {
        let distance = geo::haversine_km(unit.location, location);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((unit, distance)),
        }
    }
    best.map(|(u, d)| (u.clone(), d))
}
