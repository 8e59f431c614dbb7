//! Incident entity and its auditable status history.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::geo::{self, GeoPoint};
use crate::status::IncidentStatus;

/// One entry in an incident's append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: IncidentStatus,
    pub timestamp: OffsetDateTime,
    /// Role of the actor who recorded the change, e.g. "dispatcher" or
    /// "ambulance_driver".
    pub updated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Last reported position of the assigned ambulance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceLocation {
    #[serde(flatten)]
    pub location: GeoPoint,
    pub last_updated: OffsetDateTime,
}

/// One emergency report and its full lifecycle record.
///
/// Never physically deleted; terminal incidents are retained for audit.
/// Status changes go through [`Incident::record_status`] exclusively, which
/// keeps the history invariant (non-empty, monotonic timestamps, last entry
/// matches `status`) true by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,

    // Reporter
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub emergency_type: String,
    /// Reporter position, fixed at dispatch time.
    pub location: GeoPoint,

    // Assignment
    pub hospital_name: String,
    pub hospital_email: String,
    pub ambulance_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambulance_driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambulance_driver_phone: Option<String>,

    // Live tracking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_ambulance_location: Option<AmbulanceLocation>,
    pub distance_km: f64,
    pub eta_minutes: u32,

    // Lifecycle
    pub status: IncidentStatus,
    pub status_history: Vec<StatusHistoryEntry>,
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived_at_scene_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_loaded_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived_at_hospital_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<OffsetDateTime>,
}

/// Parameters for creating a new incident at dispatch time.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub incident_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub emergency_type: String,
    pub location: GeoPoint,
    pub hospital_name: String,
    pub hospital_email: String,
    pub ambulance_id: String,
    pub distance_km: f64,
    pub eta_minutes: u32,
    pub created_at: OffsetDateTime,
}

impl Incident {
    /// Create a freshly dispatched incident with its first history entry.
    pub fn dispatched(new: NewIncident) -> Self {
        Self {
            incident_id: new.incident_id,
            user_id: new.user_id,
            user_name: new.user_name,
            user_email: new.user_email,
            emergency_type: new.emergency_type,
            location: new.location,
            hospital_name: new.hospital_name,
            hospital_email: new.hospital_email,
            ambulance_id: new.ambulance_id,
            ambulance_driver_name: None,
            ambulance_driver_phone: None,
            current_ambulance_location: None,
            distance_km: new.distance_km,
            eta_minutes: new.eta_minutes,
            status: IncidentStatus::Dispatched,
            status_history: vec![StatusHistoryEntry {
                status: IncidentStatus::Dispatched,
                timestamp: new.created_at,
                updated_by: "dispatcher".to_string(),
                notes: None,
            }],
            created_at: new.created_at,
            accepted_at: None,
            arrived_at_scene_at: None,
            patient_loaded_at: None,
            arrived_at_hospital_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    /// Apply a status change: set `status`, append a history entry, and stamp
    /// the milestone timestamp field, all at the same instant.
    pub fn record_status(
        &mut self,
        status: IncidentStatus,
        updated_by: &str,
        notes: Option<String>,
        at: OffsetDateTime,
    ) {
        self.status = status;
        self.status_history.push(StatusHistoryEntry {
            status,
            timestamp: at,
            updated_by: updated_by.to_string(),
            notes,
        });
        match status {
            IncidentStatus::ArrivedAtScene => self.arrived_at_scene_at = Some(at),
            IncidentStatus::PatientLoaded => self.patient_loaded_at = Some(at),
            IncidentStatus::ArrivedAtHospital => self.arrived_at_hospital_at = Some(at),
            IncidentStatus::Completed => self.completed_at = Some(at),
            IncidentStatus::Cancelled => self.cancelled_at = Some(at),
            _ => {}
        }
    }

    /// Apply a live location report from the assigned ambulance.
    ///
    /// Recomputes distance and ETA against the fixed reporter position. Does
    /// not touch the status history.
    pub fn apply_location(&mut self, position: GeoPoint, at: OffsetDateTime) {
        let distance = geo::haversine_km(position, self.location);
        self.current_ambulance_location = Some(AmbulanceLocation {
            location: position,
            last_updated: at,
        });
        self.distance_km = geo::round_km(distance);
        self.eta_minutes = geo::eta_minutes(distance);
    }

    /// Timestamp of the most recent tracking information: the last location
    /// report, falling back to creation time.
    pub fn last_updated(&self) -> OffsetDateTime {
        self.current_ambulance_location
            .as_ref()
            .map(|l| l.last_updated)
            .unwrap_or(self.created_at)
    }

    /// Check the history invariant; used by tests and debug assertions.
    pub fn history_is_consistent(&self) -> bool {
        let Some(last) = self.status_history.last() else {
            return false;
        };
        if last.status != self.status {
            return false;
        }
        self.status_history
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    }
}
