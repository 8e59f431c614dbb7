pub mod error;
pub mod geo;
pub mod id;
pub mod incident;
pub mod status;
pub mod time;
pub mod unit;

pub use error::{DispatchError, ErrorCategory, Result};
pub use geo::{GeoPoint, eta_minutes, haversine_km, round_km};
pub use id::generate_incident_id;
pub use incident::{AmbulanceLocation, Incident, NewIncident, StatusHistoryEntry};
pub use status::{IncidentStatus, TransitionPolicy};
pub use time::{format_rfc3339, now_utc};
pub use unit::AmbulanceUnit;
