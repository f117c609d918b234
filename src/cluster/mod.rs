//! Cluster Layer
//!
//! Ties the rank-local pieces (store, directory, cache) together into the
//! distributed particle store.
//!
//! ## Architecture Overview
//! Every mutating operation follows the same two-phase shape:
//! 1. **Token broadcast**: an `Enter*` request reaches every rank, so all
//!    ranks walk the same handler path (patching or dropping directories,
//!    stripping bonds, firing the particle-changed hook).
//! 2. **Payload transfer**: if the acting rank is remote, the payload travels
//!    point-to-point; handlers only touch rank-local state and never start a
//!    collective of their own, which keeps concurrent calls deadlock-free.
//!
//! ## Submodules
//! - **`types`**: rank identity, static peer table, per-node configuration.
//! - **`protocol`**: rank-to-rank messages, public API DTOs and endpoints.
//! - **`transport`**: the narrow transport trait (broadcast + point-to-point).
//! - **`local`**: in-process transport wiring for tests and single-process runs.
//! - **`http`**: reqwest transport over the static peer table.
//! - **`node`**: the per-rank service object exposing the public API.
//! - **`handlers`**: axum endpoint handlers for the HTTP deployment.

pub mod handlers;
pub mod http;
pub mod local;
pub mod node;
pub mod protocol;
pub mod transport;
pub mod types;
