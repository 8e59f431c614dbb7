//! Storage backends for the SIREN dispatch server.
//!
//! [`InMemoryStore`] backs tests and single-node deployments that do not
//! need durability. [`JsonFileStore`] persists each collection to a JSON
//! file, matching the original deployment model behind the per-entity
//! compare-and-swap port.

pub mod file;
pub mod storage;

pub use file::JsonFileStore;
pub use storage::InMemoryStore;
