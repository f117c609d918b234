//! Particle Data Model
//!
//! Defines the authoritative particle record and its identity type. Exactly
//! one rank holds the authoritative copy of a record at any instant; every
//! other rank sees it only as a read-only snapshot fetched through the cache.

pub mod types;
