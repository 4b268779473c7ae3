//! Block cache tests.

/// Slot indexing, install, lookup and invalidation.
pub mod block_cache;
