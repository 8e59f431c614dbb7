//! Incident identifier generation.
//!
//! Identifiers are opaque to clients but sort in generation order:
//! `INC-{unix_millis}-{counter}`. The counter disambiguates ids minted in
//! the same millisecond within one process.

use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn generate_incident_id() -> String {
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("INC-{now}-{count:04}")
}
