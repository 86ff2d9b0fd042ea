//! Top-level facade crate for loadcop.
//!
//! Re-exports the core types and the guard library so users can depend on a single crate.

pub mod core {
    pub use loadcop_core::*;
}

pub mod guard {
    pub use loadcop_guard::*;
}

pub use loadcop_core::{EnforcementLevel, LoadCopError, Result};
pub use loadcop_guard::{Host, PolicyStore};
