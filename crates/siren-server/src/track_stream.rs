//! The live tracking SSE endpoint.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use futures_util::Stream;
use siren_core::DispatchError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::broker::{SubscriberGuard, TrackingBroker, TrackingEvent};
use crate::handlers::ApiError;
use crate::server::AppState;

/// Keep-alive cadence so proxies do not time out an idle stream.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Broker events rendered as SSE `data:` frames. Dropping the stream detaches
/// the subscriber through the guard.
pub struct TrackingEventStream {
    events: ReceiverStream<TrackingEvent>,
    _guard: SubscriberGuard,
}

impl Stream for TrackingEventStream {
    type Item = Result<Event, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.events).poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Event::default().json_data(&event))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Attach a subscriber and queue its opening `connected` + snapshot frames.
///
/// The registry entry is created before the snapshot read. An update published
/// while the snapshot loads lands in the queue behind `connected`, and the
/// snapshot itself is at least as new as anything queued before the read, so
/// the client always converges on the latest state. An unknown incident fails
/// the snapshot read; the guard drop then detaches the short-lived entry.
async fn subscribe(
    state: &AppState,
    incident_id: &str,
) -> Result<(SubscriberGuard, mpsc::Receiver<TrackingEvent>), DispatchError> {
    let (guard, rx) = TrackingBroker::attach(&state.broker, incident_id);
    guard.queue(TrackingEvent::connected(incident_id));

    let snapshot = state.tracking.snapshot(incident_id).await?;
    guard.queue(TrackingEvent::new(
        "tracking_update",
        serde_json::to_value(&snapshot)?,
    ));

    Ok((guard, rx))
}

/// GET /api/track/{incident_id}
///
/// Subscribes the caller to an incident's tracking events. The first frames
/// are `connected` and a `tracking_update` snapshot, so a client starts from
/// known state and then receives every subsequent update. An unknown incident
/// is a 404, not an empty stream.
pub async fn track_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Sse<KeepAliveStream<TrackingEventStream>>, ApiError> {
    let (guard, rx) = subscribe(&state, &incident_id).await?;

    let stream = TrackingEventStream {
        events: ReceiverStream::new(rx),
        _guard: guard,
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Semaphore;

    use siren_core::{AmbulanceUnit, GeoPoint, Incident};
    use siren_db_memory::InMemoryStore;
    use siren_notifications::NoopNotifier;
    use siren_storage::{DispatchStore, StorageError, Versioned};

    use crate::config::AppConfig;
    use crate::dispatch::EmergencyReport;

    /// Delegates to an in-memory store but holds incident reads at a gate,
    /// so a test can act while a snapshot load is in flight.
    struct GatedStore {
        inner: InMemoryStore,
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl DispatchStore for GatedStore {
        async fn list_units(&self) -> Result<Vec<Versioned<AmbulanceUnit>>, StorageError> {
            self.inner.list_units().await
        }

        async fn get_unit(
            &self,
            id: &str,
        ) -> Result<Option<Versioned<AmbulanceUnit>>, StorageError> {
            self.inner.get_unit(id).await
        }

        async fn put_unit(
            &self,
            unit: &AmbulanceUnit,
            expected: Option<u64>,
        ) -> Result<u64, StorageError> {
            self.inner.put_unit(unit, expected).await
        }

        async fn list_incidents(&self) -> Result<Vec<Versioned<Incident>>, StorageError> {
            self.inner.list_incidents().await
        }

        async fn get_incident(
            &self,
            id: &str,
        ) -> Result<Option<Versioned<Incident>>, StorageError> {
            self.gate.acquire().await.expect("gate closed").forget();
            self.inner.get_incident(id).await
        }

        async fn put_incident(
            &self,
            incident: &Incident,
            expected: Option<u64>,
        ) -> Result<u64, StorageError> {
            self.inner.put_incident(incident, expected).await
        }

        fn backend_name(&self) -> &'static str {
            "gated"
        }
    }

    async fn state_with_incident(gate: Arc<Semaphore>) -> (AppState, String) {
        let inner = InMemoryStore::new();
        inner
            .put_unit(
                &AmbulanceUnit::new(
                    "AMB-001",
                    "City General",
                    "dispatch@cg.example",
                    GeoPoint::new(12.97, 77.59),
                ),
                None,
            )
            .await
            .unwrap();

        let store = Arc::new(GatedStore { inner, gate });
        let state = AppState::new(
            store,
            Arc::new(NoopNotifier),
            None,
            &AppConfig::default(),
        );

        let outcome = state
            .dispatch
            .dispatch(EmergencyReport {
                user_id: "42".into(),
                user_name: "Ravi".into(),
                user_email: "ravi@example.com".into(),
                emergency_type: "Cardiac".into(),
                location: GeoPoint::new(12.9716, 77.5946),
            })
            .await
            .unwrap();
        (state, outcome.incident.incident_id)
    }

    #[tokio::test]
    async fn test_subscribe_opens_with_connected_then_snapshot() {
        let (state, incident_id) = state_with_incident(Arc::new(Semaphore::new(16))).await;

        let (_guard, mut rx) = subscribe(&state, &incident_id).await.unwrap();
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type, "connected");
        assert_eq!(second.event_type, "tracking_update");
        assert_eq!(second.data["incident_id"], incident_id.as_str());
    }

    #[tokio::test]
    async fn test_update_published_during_snapshot_load_reaches_subscriber() {
        let gate = Arc::new(Semaphore::new(0));
        let (state, incident_id) = state_with_incident(Arc::clone(&gate)).await;

        let task = tokio::spawn({
            let state = state.clone();
            let incident_id = incident_id.clone();
            async move { subscribe(&state, &incident_id).await }
        });

        // The subscriber must be registered before its snapshot read returns.
        for _ in 0..1000 {
            if state.broker.connection_stats().total_subscribers == 1 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(state.broker.connection_stats().total_subscribers, 1);

        // Publish while the snapshot load is parked at the gate, then let
        // the load finish.
        state.broker.publish(
            &incident_id,
            &TrackingEvent::new("status_update", json!({ "status": "En Route" })),
        );
        gate.add_permits(16);

        let (_guard, mut rx) = task.await.unwrap().unwrap();
        let mut types = Vec::new();
        for _ in 0..3 {
            types.push(rx.recv().await.unwrap().event_type);
        }
        assert_eq!(types[0], "connected");
        assert!(types.contains(&"status_update".to_string()));
        assert!(types.contains(&"tracking_update".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_incident_fails_and_detaches() {
        let (state, _) = state_with_incident(Arc::new(Semaphore::new(16))).await;

        let err = subscribe(&state, "INC-404").await.unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { .. }));
        assert_eq!(state.broker.connection_stats().total_subscribers, 0);
    }
}
