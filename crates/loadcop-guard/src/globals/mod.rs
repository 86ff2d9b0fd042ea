//! Global state guard.
//!
//! Captures a catalog of global bindings before an untrusted action and
//! reconciles them afterwards. Restoration is a diff-and-patch: only bindings
//! and properties that actually changed are touched, so frozen or
//! non-configurable builtins that were left alone never cause failures.

mod catalog;
mod restore;
mod snapshot;

pub use catalog::GlobalCatalog;
pub use restore::{restore, RestoreFailure, RestoreReport, VOLATILE_PROPERTIES};
pub use snapshot::{capture, GlobalSnapshot, ObjectSnapshot};

use crate::host::Environment;

/// Scoped snapshot: restores on [`GlobalGuard::restore`], or on drop if the
/// protected action unwound first.
pub struct GlobalGuard<'e> {
    env: &'e Environment,
    snapshot: Option<GlobalSnapshot>,
}

impl<'e> GlobalGuard<'e> {
    pub fn capture(env: &'e Environment, catalog: &GlobalCatalog) -> Self {
        Self {
            env,
            snapshot: Some(capture(env, catalog)),
        }
    }

    pub fn restore(mut self) -> RestoreReport {
        match self.snapshot.take() {
            Some(snapshot) => restore(self.env, snapshot),
            None => RestoreReport::default(),
        }
    }
}

impl Drop for GlobalGuard<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            let report = restore(self.env, snapshot);
            tracing::warn!(
                changes = report.changes(),
                failures = report.failures.len(),
                "globals restored after aborted action"
            );
        }
    }
}
