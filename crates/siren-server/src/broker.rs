//! Per-incident pub/sub registry feeding the live tracking streams.
//!
//! Subscribers attach under an incident id and receive events over a bounded
//! channel. Publish is fire-and-forget: a full channel drops that event for
//! that subscriber, a closed channel removes the subscriber. Publishing to an
//! incident nobody watches is a silent no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::json;
use tokio::sync::mpsc;

/// Events delivered per subscriber: at most once, in publish order.
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 32;

/// One event on a tracking stream, serialized as `{ "type": ..., "data": ... }`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrackingEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: serde_json::Value,
}

impl TrackingEvent {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }

    pub fn connected(incident_id: &str) -> Self {
        Self::new("connected", json!({ "incident_id": incident_id }))
    }
}

#[derive(Debug)]
struct SubscriberHandle {
    id: u64,
    sender: mpsc::Sender<TrackingEvent>,
}

/// Per-incident subscriber counts, for the connections debug endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConnectionStats {
    pub total_subscribers: usize,
    pub incidents: HashMap<String, usize>,
}

/// Concurrent registry of tracking subscribers, keyed by incident id.
#[derive(Debug, Default)]
pub struct TrackingBroker {
    subscribers: RwLock<HashMap<String, Vec<SubscriberHandle>>>,
    next_id: AtomicU64,
}

/// Detaches its subscriber when dropped. Idempotent: an explicit
/// [`TrackingBroker::detach`] followed by the drop is harmless.
#[derive(Debug)]
pub struct SubscriberGuard {
    broker: Arc<TrackingBroker>,
    incident_id: String,
    subscriber_id: u64,
    sender: mpsc::Sender<TrackingEvent>,
}

impl SubscriberGuard {
    /// Queue an event to this subscriber only, skipping the registry.
    ///
    /// Used for the initial `connected` and snapshot events before the stream
    /// is handed to the client. Returns false if the channel is full or
    /// closed.
    pub fn queue(&self, event: TrackingEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.broker.detach(&self.incident_id, self.subscriber_id);
    }
}

impl TrackingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for an incident.
    ///
    /// The caller receives the channel's receiving end plus a guard that
    /// detaches on drop. The initial `connected` and snapshot events are
    /// queued by the HTTP layer before the stream is handed to the client.
    pub fn attach(
        broker: &Arc<TrackingBroker>,
        incident_id: &str,
    ) -> (SubscriberGuard, mpsc::Receiver<TrackingEvent>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let id = broker.next_id.fetch_add(1, Ordering::Relaxed);

        broker
            .subscribers
            .write()
            .entry(incident_id.to_string())
            .or_default()
            .push(SubscriberHandle {
                id,
                sender: tx.clone(),
            });

        tracing::debug!(incident_id = %incident_id, subscriber_id = id, "Tracking subscriber attached");

        let guard = SubscriberGuard {
            broker: Arc::clone(broker),
            incident_id: incident_id.to_string(),
            subscriber_id: id,
            sender: tx,
        };
        (guard, rx)
    }

    /// Deliver an event to every current subscriber of an incident.
    ///
    /// Never suspends on subscriber I/O. Closed channels are pruned; a full
    /// channel drops this event for that subscriber only.
    pub fn publish(&self, incident_id: &str, event: &TrackingEvent) {
        let mut subscribers = self.subscribers.write();
        let Some(handles) = subscribers.get_mut(incident_id) else {
            return;
        };

        handles.retain(|handle| match handle.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    incident_id = %incident_id,
                    subscriber_id = handle.id,
                    event_type = %event.event_type,
                    "Subscriber channel full, dropping event"
                );
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(
                    incident_id = %incident_id,
                    subscriber_id = handle.id,
                    "Subscriber channel closed, removing"
                );
                false
            }
        });

        if handles.is_empty() {
            subscribers.remove(incident_id);
        }
    }

    /// Remove one subscriber. Idempotent; the incident key disappears with
    /// its last subscriber.
    pub fn detach(&self, incident_id: &str, subscriber_id: u64) {
        let mut subscribers = self.subscribers.write();
        if let Some(handles) = subscribers.get_mut(incident_id) {
            handles.retain(|h| h.id != subscriber_id);
            if handles.is_empty() {
                subscribers.remove(incident_id);
            }
        }
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let subscribers = self.subscribers.read();
        let incidents: HashMap<String, usize> = subscribers
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect();
        ConnectionStats {
            total_subscribers: incidents.values().sum(),
            incidents,
        }
    }
}
