//! The incident lifecycle state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Lifecycle status of an incident.
///
/// Serialized with the human-readable labels the mobile clients already
/// speak, e.g. `"En Route to Hospital"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentStatus {
    Pending,
    Dispatched,
    #[serde(rename = "En Route")]
    EnRoute,
    #[serde(rename = "Arrived at Scene")]
    ArrivedAtScene,
    #[serde(rename = "Patient Loaded")]
    PatientLoaded,
    #[serde(rename = "En Route to Hospital")]
    EnRouteToHospital,
    #[serde(rename = "Arrived at Hospital")]
    ArrivedAtHospital,
    Completed,
    Cancelled,
}

impl IncidentStatus {
    /// Position in the forward lifecycle order. `Cancelled` sits outside the
    /// forward chain and compares as terminal.
    pub fn forward_rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Dispatched => 1,
            Self::EnRoute => 2,
            Self::ArrivedAtScene => 3,
            Self::PatientLoaded => 4,
            Self::EnRouteToHospital => 5,
            Self::ArrivedAtHospital => 6,
            Self::Completed => 7,
            Self::Cancelled => 8,
        }
    }

    /// Terminal states accept no further transitions and release the unit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a driver may accept an incident in this state.
    pub fn accepts_driver(&self) -> bool {
        matches!(self, Self::Pending | Self::Dispatched)
    }

    /// Statuses a driver may move an incident to via `update_status`.
    /// `Pending` is excluded: nothing returns to the pre-dispatch state.
    pub fn is_updatable_target(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Dispatched => "Dispatched",
            Self::EnRoute => "En Route",
            Self::ArrivedAtScene => "Arrived at Scene",
            Self::PatientLoaded => "Patient Loaded",
            Self::EnRouteToHospital => "En Route to Hospital",
            Self::ArrivedAtHospital => "Arrived at Hospital",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for IncidentStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Dispatched" => Ok(Self::Dispatched),
            "En Route" => Ok(Self::EnRoute),
            "Arrived at Scene" => Ok(Self::ArrivedAtScene),
            "Patient Loaded" => Ok(Self::PatientLoaded),
            "En Route to Hospital" => Ok(Self::EnRouteToHospital),
            "Arrived at Hospital" => Ok(Self::ArrivedAtHospital),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(DispatchError::validation(format!(
                "Invalid status: {other}"
            ))),
        }
    }
}

/// How strictly `update_status` enforces the forward lifecycle order.
///
/// The deployed system never enforced ordering on the update path (drivers
/// correct mis-taps by re-sending an earlier status), so `Permissive` is the
/// default. `Strict` rejects backward moves and any transition out of a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    /// Validate a proposed transition under this policy.
    ///
    /// Membership in the updatable set is checked by the caller (an unknown
    /// label never parses); this gate covers ordering only.
    pub fn check(
        &self,
        from: IncidentStatus,
        to: IncidentStatus,
    ) -> Result<(), DispatchError> {
        match self {
            Self::Permissive => Ok(()),
            Self::Strict => {
                if from.is_terminal() {
                    return Err(DispatchError::invalid_transition(
                        from.as_label(),
                        to.as_label(),
                    ));
                }
                // Cancellation is reachable from any non-terminal state.
                if to == IncidentStatus::Cancelled {
                    return Ok(());
                }
                if to.forward_rank() < from.forward_rank() {
                    return Err(DispatchError::invalid_transition(
                        from.as_label(),
                        to.as_label(),
                    ));
                }
                Ok(())
            }
        }
    }
}
