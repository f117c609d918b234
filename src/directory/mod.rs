//! Ownership Directory
//!
//! Rank-replicated mapping from particle id to owning rank. The map is built
//! lazily by a who-has exchange across all ranks and dropped wholesale when a
//! migration may have changed ownership; inserts and removals, whose owner is
//! known exactly, patch it in place.

pub mod service;
