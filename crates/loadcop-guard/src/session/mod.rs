//! Enforcement sessions.
//!
//! A session locks the policy, stacks its interceptor on the host's loader,
//! optionally snapshots globals, runs the protected action, then unwinds all
//! of that in reverse order. Each step is a scoped guard, so the unwinding
//! also happens when the action returns an error or panics.
//!
//! Only synchronous actions are supported. Work the action defers past the
//! return of [`enforce`] runs under whatever hooks are installed at that time.

mod interceptor;
mod scope;

pub use scope::{ResourceScope, ScopeStack};

use std::sync::Arc;

use loadcop_core::error::{LoadCopError, Result};

use crate::globals::GlobalGuard;
use crate::host::{ExtensionPoint, Host};
use crate::obs::EnforcementMetrics;
use crate::policy::PolicyStore;

use interceptor::Interceptor;

/// Run `action` with `store`'s policy enforced on every load `host` performs.
///
/// The action's own result, success or error, is returned unchanged.
/// Setup fails with `ReservedLevel` or `UnsupportedHost` before the action
/// runs.
pub fn enforce<R, F>(store: &PolicyStore, host: &Host, action: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    let _lock = store.lock();
    let policy = store.snapshot();
    let metrics = store.metrics_handle();

    if policy.level.is_reserved() {
        metrics.sessions.inc(&[("outcome", "refused")]);
        return Err(LoadCopError::ReservedLevel(policy.level));
    }

    let previous = host.hooks().current();
    if let Some(point) = ExtensionPoint::ALL.into_iter().find(|p| !previous.supports(*p)) {
        metrics.sessions.inc(&[("outcome", "refused")]);
        return Err(LoadCopError::UnsupportedHost(point.as_str()));
    }

    let span = tracing::debug_span!("enforce", level = %policy.level);
    let _entered = span.enter();

    let catalog = policy.globals.clone();
    let interceptor = Arc::new(Interceptor::new(policy, previous, Arc::clone(&metrics)));
    let hooks = host.hooks().install(interceptor);
    let active = ActiveSession::start(Arc::clone(&metrics));
    tracing::debug!(depth = hooks.depth(), "session started");

    let globals = catalog.map(|c| GlobalGuard::capture(host.globals(), &c));

    let outcome = action();

    if let Some(guard) = globals {
        let report = guard.restore();
        for (kind, n) in [
            ("rebound", report.rebound),
            ("removed_binding", report.removed_bindings),
            ("removed_property", report.removed_properties),
            ("redefined_property", report.redefined_properties),
            ("prototype", report.prototypes_reset),
            ("failure", report.failures.len()),
        ] {
            metrics.globals_restored.add(&[("kind", kind)], n as u64);
        }
    }

    drop(hooks);
    drop(active);
    let label = if outcome.is_ok() { "ok" } else { "error" };
    metrics.sessions.inc(&[("outcome", label)]);
    tracing::debug!(outcome = label, "session finished");
    outcome
}

struct ActiveSession(Arc<EnforcementMetrics>);

impl ActiveSession {
    fn start(metrics: Arc<EnforcementMetrics>) -> Self {
        metrics.sessions_active.inc(&[]);
        Self(metrics)
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.0.sessions_active.dec(&[]);
    }
}
