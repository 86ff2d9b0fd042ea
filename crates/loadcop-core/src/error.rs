//! Shared error type across loadcop crates.

use thiserror::Error;

use crate::level::EnforcementLevel;

/// Stable error codes, independent of message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// A named request was denied by the active enforcement level.
    PolicyViolation,
    /// A resolved file could not be attributed to an approved resource tree.
    UntrustedTree,
    /// A mutation was attempted while the policy was locked.
    LockedPolicy,
    /// The host loader lacks a required extension point.
    UnsupportedHost,
    /// The enforcement level is declared but has no behavior.
    ReservedLevel,
    /// The request could not be resolved.
    NotFound,
    /// A property or prototype could not be changed.
    Immutable,
    /// Invalid policy configuration.
    BadConfig,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::PolicyViolation => "POLICY_VIOLATION",
            ErrorCode::UntrustedTree => "UNTRUSTED_TREE",
            ErrorCode::LockedPolicy => "LOCKED_POLICY",
            ErrorCode::UnsupportedHost => "UNSUPPORTED_HOST",
            ErrorCode::ReservedLevel => "RESERVED_LEVEL",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Immutable => "IMMUTABLE",
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, LoadCopError>;

/// Unified error type used by core and guard.
#[derive(Debug, Error)]
pub enum LoadCopError {
    #[error("the loading of \"{0}\" was prevented due to security restrictions")]
    PolicyViolation(String),
    #[error("attempted to load file not part of a whitelisted resource: {0}")]
    UntrustedTree(String),
    #[error("policy is locked, no further modifications are allowed")]
    LockedPolicy,
    #[error("host loader does not expose the {0} extension point")]
    UnsupportedHost(&'static str),
    #[error("enforcement level {0} is reserved and has no defined behavior")]
    ReservedLevel(EnforcementLevel),
    #[error("cannot find \"{0}\"")]
    NotFound(String),
    #[error("cannot modify {0}")]
    Immutable(String),
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl LoadCopError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            LoadCopError::PolicyViolation(_) => ErrorCode::PolicyViolation,
            LoadCopError::UntrustedTree(_) => ErrorCode::UntrustedTree,
            LoadCopError::LockedPolicy => ErrorCode::LockedPolicy,
            LoadCopError::UnsupportedHost(_) => ErrorCode::UnsupportedHost,
            LoadCopError::ReservedLevel(_) => ErrorCode::ReservedLevel,
            LoadCopError::NotFound(_) => ErrorCode::NotFound,
            LoadCopError::Immutable(_) => ErrorCode::Immutable,
            LoadCopError::BadConfig(_) => ErrorCode::BadConfig,
            LoadCopError::Internal(_) => ErrorCode::Internal,
        }
    }
}
