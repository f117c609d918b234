//! Remote Snapshot Cache
//!
//! Bounded, recency-ordered cache of read-only particle snapshots fetched
//! from remote owners. Snapshots may go stale and are never written back;
//! collaborators flush the cache through `invalidate_all` when global state
//! changes could stale every entry at once.

pub mod fetch_cache;

#[cfg(test)]
mod tests;
