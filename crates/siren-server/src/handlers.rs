//! HTTP handlers and the response envelope.
//!
//! Every JSON response carries `{ success, message, data }`; errors map the
//! core taxonomy onto status codes (Validation 400, NotFound and the capacity
//! errors 404, InvalidTransition 409, ReservationContention 503, everything
//! else 500).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use siren_core::DispatchError;

use crate::dispatch::EmergencyReport;
use crate::lifecycle::{AcceptRequest, LocationUpdateRequest, StatusUpdateRequest};
use crate::server::AppState;

/// Standard response envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: message.into(),
        data: Some(data),
    })
}

/// Error wrapper that renders the envelope with `success: false`.
#[derive(Debug)]
pub struct ApiError(pub DispatchError);

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::NotFound { .. }
            | DispatchError::NoUnitsConfigured
            | DispatchError::NoAvailableUnit => StatusCode::NOT_FOUND,
            DispatchError::InvalidTransition { .. } => StatusCode::CONFLICT,
            DispatchError::ReservationContention => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Json(_) | DispatchError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if err.is_server_error() {
            tracing::error!(category = %err.category(), error = %err, "Request failed");
        } else {
            tracing::debug!(category = %err.category(), error = %err, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "message": err.to_string(),
        }));
        (status, body).into_response()
    }
}

// ==================== Dispatch ====================

pub async fn create_incident(
    State(state): State<AppState>,
    Json(report): Json<EmergencyReport>,
) -> Result<Response, ApiError> {
    let outcome = state.dispatch.dispatch(report).await?;
    let message = format!(
        "Ambulance {} dispatched from {}",
        outcome.incident.ambulance_id, outcome.incident.hospital_name
    );
    let body = ok(
        message,
        json!({
            "incident": outcome.incident,
            "alert_delivered": outcome.alert_delivered,
        }),
    );
    Ok((StatusCode::CREATED, body).into_response())
}

// ==================== Lifecycle ====================

pub async fn accept_incident(
    State(state): State<AppState>,
    Json(req): Json<AcceptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let incident = state.lifecycle.accept_incident(req).await?;
    Ok(ok("Incident accepted successfully", incident))
}

pub async fn update_status(
    State(state): State<AppState>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let incident = state.lifecycle.update_status(req).await?;
    Ok(ok("Status updated successfully", incident))
}

pub async fn update_location(
    State(state): State<AppState>,
    Json(req): Json<LocationUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let incident = state.lifecycle.update_location(req).await?;
    Ok(ok(
        "Location updated successfully",
        json!({
            "incident_id": incident.incident_id,
            "current_ambulance_location": incident.current_ambulance_location,
            "distance_km": incident.distance_km,
            "eta_minutes": incident.eta_minutes,
        }),
    ))
}

// ==================== Tracking queries ====================

pub async fn live_tracking(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.tracking.snapshot(&incident_id).await?;
    Ok(ok("Tracking data fetched", snapshot))
}

pub async fn incident_status(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.tracking.status(&incident_id).await?;
    Ok(ok("Status fetched", status))
}

pub async fn reporter_incidents(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let incidents = state.tracking.incidents_for_reporter(&user_id).await?;
    let count = incidents.len();
    Ok(ok(
        format!("{count} incident(s) found"),
        json!({ "incidents": incidents, "count": count }),
    ))
}

pub async fn unit_incidents(
    State(state): State<AppState>,
    Path(ambulance_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let incidents = state.tracking.incidents_for_unit(&ambulance_id).await?;
    let count = incidents.len();
    Ok(ok(
        format!("{count} incident(s) found"),
        json!({ "incidents": incidents, "count": count }),
    ))
}

// ==================== Service endpoints ====================

pub async fn track_connections(State(state): State<AppState>) -> impl IntoResponse {
    ok("Connection stats", state.broker.connection_stats())
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "siren-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "storage": state.backend_name,
    }))
}
