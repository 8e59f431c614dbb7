//! SIREN dispatch server library.
//!
//! Wires the domain core to its collaborators: a [`DispatchStore`] backend
//! behind the cache-aside layer, the SMTP alert channel, and the per-incident
//! tracking broker that feeds SSE subscribers.
//!
//! [`DispatchStore`]: siren_storage::DispatchStore

pub mod broker;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod lifecycle;
pub mod observability;
pub mod server;
pub mod track_stream;
pub mod tracking;

pub use server::{AppState, ServerBuilder, SirenServer, build_app};
