use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use siren_notifications::AlertNotifier;
use siren_storage::DispatchStore;

use crate::broker::TrackingBroker;
use crate::cache::{CacheBackend, CachedStore};
use crate::config::AppConfig;
use crate::dispatch::DispatchService;
use crate::handlers;
use crate::lifecycle::LifecycleService;
use crate::track_stream;
use crate::tracking::TrackingService;

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatch: Arc<DispatchService>,
    pub lifecycle: Arc<LifecycleService>,
    pub tracking: Arc<TrackingService>,
    pub broker: Arc<TrackingBroker>,
    pub backend_name: &'static str,
}

impl AppState {
    /// Wire the services around a storage backend and alert channel.
    pub fn new(
        store: Arc<dyn DispatchStore>,
        notifier: Arc<dyn AlertNotifier>,
        cache: Option<CacheBackend>,
        config: &AppConfig,
    ) -> Self {
        let backend_name = store.backend_name();
        let cached = CachedStore::new(store, cache, Duration::from_secs(config.cache.ttl_secs));
        let broker = Arc::new(TrackingBroker::new());

        Self {
            dispatch: Arc::new(DispatchService::new(cached.clone(), notifier)),
            lifecycle: Arc::new(LifecycleService::new(
                cached.clone(),
                Arc::clone(&broker),
                config.dispatch.transition_policy,
            )),
            tracking: Arc::new(TrackingService::new(cached)),
            broker,
            backend_name,
        }
    }
}

pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    let body_limit = config.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        // Dispatch and lifecycle
        .route("/api/incidents", post(handlers::create_incident))
        .route("/api/ambulance/accept", post(handlers::accept_incident))
        .route("/api/ambulance/status", post(handlers::update_status))
        .route("/api/ambulance/location", post(handlers::update_location))
        // Tracking queries
        .route(
            "/api/incidents/{incident_id}/live-tracking",
            get(handlers::live_tracking),
        )
        .route(
            "/api/incidents/{incident_id}/status",
            get(handlers::incident_status),
        )
        .route(
            "/api/reporters/{user_id}/incidents",
            get(handlers::reporter_incidents),
        )
        .route(
            "/api/ambulance/{ambulance_id}/incidents",
            get(handlers::unit_incidents),
        )
        // Live tracking stream
        .route("/api/track/connections", get(handlers::track_connections))
        .route("/api/track/{incident_id}", get(track_stream::track_incident))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct SirenServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    state: AppState,
}

impl ServerBuilder {
    pub fn new(state: AppState, config: AppConfig) -> Self {
        Self {
            addr: config.addr(),
            config,
            state,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn build(self) -> SirenServer {
        let app = build_app(self.state, &self.config);
        SirenServer {
            addr: self.addr,
            app,
        }
    }
}

impl SirenServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
