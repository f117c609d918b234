//! Tagged Mutation Messages
//!
//! The closed set of operations that may be applied to a particle record.
//! A mutation names the target substructure (property, position, momentum,
//! force, bonds, exclusions) and carries exactly the data it needs; list
//! mutations carry deltas, never full replacements. Each variant knows how to
//! apply itself, and dispatch is one exhaustive match, so adding a message
//! kind is a compile-checked change.

pub mod messages;

#[cfg(test)]
mod tests;
