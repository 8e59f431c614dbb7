//! End-to-end tests against the router with the in-memory store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use siren_core::{AmbulanceUnit, GeoPoint};
use siren_db_memory::InMemoryStore;
use siren_notifications::NoopNotifier;
use siren_server::config::AppConfig;
use siren_server::{AppState, build_app};
use siren_storage::DispatchStore;

async fn app_with_units(units: &[AmbulanceUnit]) -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    for unit in units {
        store.put_unit(unit, None).await.unwrap();
    }
    let config = AppConfig::default();
    let state = AppState::new(store.clone(), Arc::new(NoopNotifier), None, &config);
    (build_app(state, &config), store)
}

fn unit(id: &str, lat: f64, lon: f64) -> AmbulanceUnit {
    AmbulanceUnit::new(id, "City General", "dispatch@cg.example", GeoPoint::new(lat, lon))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn report() -> Value {
    json!({
        "user_id": "42",
        "user_name": "Ravi",
        "user_email": "ravi@example.com",
        "emergency_type": "Cardiac",
        "location": { "latitude": 12.9716, "longitude": 77.5946 }
    })
}

async fn dispatch_one(app: &Router) -> String {
    let response = app.clone().oneshot(post("/api/incidents", report())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    body["data"]["incident"]["incident_id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_health_endpoints() {
    let (app, _) = app_with_units(&[]).await;

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["service"], "siren-server");

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_dispatch_engages_nearest_unit() {
    let (app, store) = app_with_units(&[
        unit("AMB-FAR", 20.0, 77.0),
        unit("AMB-NEAR", 12.98, 77.60),
    ])
    .await;

    let response = app.oneshot(post("/api/incidents", report())).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["incident"]["ambulance_id"], "AMB-NEAR");
    assert_eq!(body["data"]["incident"]["status"], "Dispatched");
    assert_eq!(body["data"]["alert_delivered"], true);

    let stored = store.get_unit("AMB-NEAR").await.unwrap().unwrap();
    assert!(stored.value.engaged);
}

#[tokio::test]
async fn test_dispatch_without_units_is_404() {
    let (app, _) = app_with_units(&[]).await;
    let response = app.oneshot(post("/api/incidents", report())).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_dispatch_validation_is_400() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let mut bad = report();
    bad["user_name"] = json!("");
    let response = app.oneshot(post("/api/incidents", bad)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_accept_then_track() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let incident_id = dispatch_one(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/ambulance/accept",
            json!({
                "incident_id": incident_id,
                "ambulance_driver_name": "Kiran",
                "ambulance_driver_phone": "+91-98-0000"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Incident accepted successfully");

    let response = app
        .oneshot(get(&format!("/api/incidents/{incident_id}/live-tracking")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["ambulance_driver_name"], "Kiran");
    assert_eq!(body["data"]["hospital_name"], "City General");
    assert!(body["data"]["status_history"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn test_status_update_and_unit_release() {
    let (app, store) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let incident_id = dispatch_one(&app).await;

    let response = app
        .clone()
        .oneshot(post(
            "/api/ambulance/status",
            json!({ "incident_id": incident_id, "new_status": "En Route" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post(
            "/api/ambulance/status",
            json!({ "incident_id": incident_id, "new_status": "Completed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = store.get_unit("AMB-001").await.unwrap().unwrap();
    assert!(!stored.value.engaged);

    let response = app
        .oneshot(get(&format!("/api/incidents/{incident_id}/status")))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "Completed");
}

#[tokio::test]
async fn test_bogus_status_is_400() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let incident_id = dispatch_one(&app).await;

    let response = app
        .oneshot(post(
            "/api/ambulance/status",
            json!({ "incident_id": incident_id, "new_status": "Teleported" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_location_update_recomputes_eta() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let incident_id = dispatch_one(&app).await;

    let response = app
        .oneshot(post(
            "/api/ambulance/location",
            json!({
                "incident_id": incident_id,
                "ambulance_id": "AMB-001",
                "location": { "latitude": 12.9720, "longitude": 77.5950 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["eta_minutes"], 1);
    assert!(body["data"]["current_ambulance_location"]["latitude"].is_number());
}

#[tokio::test]
async fn test_location_update_wrong_unit_is_404() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let incident_id = dispatch_one(&app).await;

    let response = app
        .oneshot(post(
            "/api/ambulance/location",
            json!({
                "incident_id": incident_id,
                "ambulance_id": "AMB-999",
                "location": { "latitude": 12.97, "longitude": 77.59 }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reporter_incidents_unknown_is_empty_success() {
    let (app, _) = app_with_units(&[]).await;
    let response = app
        .oneshot(get("/api/reporters/nobody/incidents"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["count"], 0);
}

#[tokio::test]
async fn test_unit_work_queue() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let incident_id = dispatch_one(&app).await;

    let response = app
        .oneshot(get("/api/ambulance/AMB-001/incidents"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["incidents"][0]["incident_id"], incident_id);
}

#[tokio::test]
async fn test_tracking_unknown_incident_is_404() {
    let (app, _) = app_with_units(&[]).await;
    for uri in [
        "/api/incidents/INC-404/live-tracking",
        "/api/incidents/INC-404/status",
        "/api/track/INC-404",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_track_stream_headers() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    let incident_id = dispatch_one(&app).await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/track/{incident_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let response = app.oneshot(get("/api/track/connections")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_second_dispatch_exhausts_units() {
    let (app, _) = app_with_units(&[unit("AMB-001", 12.97, 77.59)]).await;
    dispatch_one(&app).await;

    let response = app.oneshot(post("/api/incidents", report())).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["message"], "No available ambulance units nearby");
}
