use siren_core::GeoPoint;

/// Everything the hospital needs to know about a fresh dispatch.
#[derive(Debug, Clone)]
pub struct DispatchAlert {
    pub incident_id: String,
    pub emergency_type: String,
    pub reporter_name: String,
    /// Reply-to address so the hospital can reach the reporter directly.
    pub reporter_email: String,
    pub hospital_name: String,
    /// Recipient address.
    pub hospital_email: String,
    pub ambulance_id: String,
    pub location: GeoPoint,
    pub eta_minutes: u32,
}
