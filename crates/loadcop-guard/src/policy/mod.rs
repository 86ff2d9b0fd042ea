//! Policy layer (lists, substitutions, locking, evaluation).
//!
//! The store is mutated by its owner between sessions and frozen into a
//! [`PolicySnapshot`] for the duration of each session.

pub mod engine;
pub mod store;

pub use engine::{evaluate, PolicyDecision};
pub use store::{PolicyLock, PolicySnapshot, PolicyStore};
