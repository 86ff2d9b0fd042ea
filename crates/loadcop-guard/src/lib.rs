//! loadcop guard library.
//!
//! This crate wires the policy store, the hookable module host, the
//! enforcement session and the global state guard into one enforcement layer.
//! Callers configure a [`policy::PolicyStore`], then run untrusted code through
//! [`policy::PolicyStore::enforce`] against a [`host::Host`].

pub mod config;
pub mod globals;
pub mod host;
pub mod obs;
pub mod policy;
pub mod session;

pub use host::Host;
pub use policy::{PolicyStore, PolicySnapshot};
