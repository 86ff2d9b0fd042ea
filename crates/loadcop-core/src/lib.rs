//! loadcop core: request classification, the host value model, and the error
//! surface shared by the guard and facade crates.
//!
//! This crate carries no loader or runtime dependencies. It defines what a
//! load request looks like, how values crossing the loader boundary are
//! modelled, and which errors the enforcement layer can raise.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Poisoned locks are recovered instead of propagated as panics.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod level;
pub mod reference;
pub mod value;

/// Shared result type.
pub use error::{LoadCopError, Result};
pub use level::EnforcementLevel;
