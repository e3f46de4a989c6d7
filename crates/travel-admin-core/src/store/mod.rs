//! Local store for offline data access.
//!
//! `LocalStore` keeps one JSON array per collection on disk. The gateway
//! writes through to it after every successful remote read and serves from
//! it when the remote tiers fail. `mock` holds the canned datasets used when
//! the store has nothing for a collection.

pub mod manager;
pub mod mock;

pub use manager::{CachedData, LocalStore, StoreEntry, StoreSummary};
