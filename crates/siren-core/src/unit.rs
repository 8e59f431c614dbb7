//! Ambulance unit entity.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// An ambulance unit stationed at a hospital.
///
/// Created administratively; this core only flips `engaged` — reservation at
/// dispatch time and release when the bound incident reaches a terminal
/// state. A unit is engaged iff exactly one non-terminal incident references
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbulanceUnit {
    pub ambulance_id: String,
    /// Hospital display name.
    pub name: String,
    /// Hospital contact address for dispatch alerts.
    pub email: String,
    #[serde(flatten)]
    pub location: GeoPoint,
    #[serde(default)]
    pub engaged: bool,
}

impl AmbulanceUnit {
    pub fn new(
        ambulance_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        location: GeoPoint,
    ) -> Self {
        Self {
            ambulance_id: ambulance_id.into(),
            name: name.into(),
            email: email.into(),
            location,
            engaged: false,
        }
    }
}
