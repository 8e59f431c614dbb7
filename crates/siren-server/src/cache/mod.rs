//! Cache-aside layer over the dispatch store.
//!
//! Collection reads go through a two-tier backend (local DashMap L1, optional
//! Redis L2); every write goes to the store first and then invalidates the
//! affected keys. A disabled cache is a permanent miss and changes nothing
//! functionally.

pub mod backend;
pub mod store;

pub use backend::{CacheBackend, CacheStats, CachedEntry};
pub use store::CachedStore;
