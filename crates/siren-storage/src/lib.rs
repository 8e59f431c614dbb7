//! Persistence port for the SIREN dispatch core.
//!
//! The core treats durable storage as an opaque collaborator: ambulance
//! units and incidents are read and written per entity, with optimistic
//! revision checks so concurrent mutations surface as conflicts instead of
//! silently clobbering each other.

pub mod error;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use traits::DispatchStore;
pub use types::Versioned;
