use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use loadcop_core::error::{LoadCopError, Result};
use loadcop_core::level::EnforcementLevel;
use loadcop_core::value::Value;

use crate::globals::GlobalCatalog;
use crate::host::Host;
use crate::obs::EnforcementMetrics;
use crate::session;

/// Immutable copy of the policy, taken when a session starts.
#[derive(Debug, Clone, Default)]
pub struct PolicySnapshot {
    pub level: EnforcementLevel,
    pub whitelist: BTreeSet<String>,
    pub blacklist: BTreeSet<String>,
    pub substitutions: HashMap<String, Value>,
    /// `Some` when global protection is enabled.
    pub globals: Option<GlobalCatalog>,
}

impl PolicySnapshot {
    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelist.contains(name)
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(name)
    }

    pub fn substitute(&self, name: &str) -> Option<&Value> {
        self.substitutions.get(name)
    }
}

#[derive(Debug, Default)]
struct PolicyState {
    policy: PolicySnapshot,
    // nesting depth of held locks; locked while > 0
    locks: usize,
}

/// Mutable policy configuration shared by the sessions that enforce it.
///
/// Every mutator fails with [`LoadCopError::LockedPolicy`] while a lock is
/// held. Readers hand out copies so nothing can bypass the lock.
#[derive(Default)]
pub struct PolicyStore {
    state: RwLock<PolicyState>,
    metrics: Arc<EnforcementMetrics>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, PolicyState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut PolicySnapshot) -> T) -> Result<T> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.locks > 0 {
            return Err(LoadCopError::LockedPolicy);
        }
        Ok(f(&mut state.policy))
    }

    pub fn add_to_whitelist(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.mutate(|p| {
            p.whitelist.insert(name);
        })
    }

    pub fn remove_from_whitelist(&self, name: &str) -> Result<()> {
        self.mutate(|p| {
            p.whitelist.remove(name);
        })
    }

    pub fn add_to_blacklist(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.mutate(|p| {
            p.blacklist.insert(name);
        })
    }

    pub fn remove_from_blacklist(&self, name: &str) -> Result<()> {
        self.mutate(|p| {
            p.blacklist.remove(name);
        })
    }

    /// Serve `value` instead of the real resource whenever `name` is
    /// permitted.
    pub fn add_substitution(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        self.mutate(|p| {
            p.substitutions.insert(name, value);
        })
    }

    pub fn remove_substitution(&self, name: &str) -> Result<()> {
        self.mutate(|p| {
            p.substitutions.remove(name);
        })
    }

    pub fn enforcement_level(&self) -> EnforcementLevel {
        self.read().policy.level
    }

    pub fn set_enforcement_level(&self, level: EnforcementLevel) -> Result<()> {
        self.mutate(|p| p.level = level)
    }

    /// Snapshot and restore `catalog` around every enforced action.
    pub fn protect_globals(&self, catalog: GlobalCatalog) -> Result<()> {
        self.mutate(|p| p.globals = Some(catalog))
    }

    pub fn unprotect_globals(&self) -> Result<()> {
        self.mutate(|p| p.globals = None)
    }

    pub fn whitelist(&self) -> BTreeSet<String> {
        self.read().policy.whitelist.clone()
    }

    pub fn blacklist(&self) -> BTreeSet<String> {
        self.read().policy.blacklist.clone()
    }

    pub fn substitutions(&self) -> HashMap<String, Value> {
        self.read().policy.substitutions.clone()
    }

    pub fn global_catalog(&self) -> Option<GlobalCatalog> {
        self.read().policy.globals.clone()
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        self.read().policy.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.read().locks > 0
    }

    /// Lock the store until the returned guard is dropped or unlocked.
    /// Locks nest: the store stays locked until every guard is released.
    #[must_use = "dropping the lock releases it immediately"]
    pub fn lock(&self) -> PolicyLock<'_> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.locks += 1;
        tracing::debug!(depth = state.locks, "policy locked");
        PolicyLock { store: self }
    }

    pub fn metrics(&self) -> &EnforcementMetrics {
        &self.metrics
    }

    pub(crate) fn metrics_handle(&self) -> Arc<EnforcementMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run `action` with this policy enforced on `host`.
    ///
    /// See [`session::enforce`].
    pub fn enforce<R, F>(&self, host: &Host, action: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        session::enforce(self, host, action)
    }
}

/// Scoped policy lock.
pub struct PolicyLock<'a> {
    store: &'a PolicyStore,
}

impl PolicyLock<'_> {
    pub fn unlock(self) {}
}

impl Drop for PolicyLock<'_> {
    fn drop(&mut self) {
        let mut state = self.store.state.write().unwrap_or_else(PoisonError::into_inner);
        state.locks = state.locks.saturating_sub(1);
        tracing::debug!(depth = state.locks, "policy lock released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutators_fail_while_locked() {
        let store = PolicyStore::new();
        store.add_to_blacklist("jshint").unwrap();

        let lock = store.lock();
        assert!(store.is_locked());
        assert!(matches!(store.add_to_blacklist("console"), Err(LoadCopError::LockedPolicy)));
        assert!(matches!(store.remove_from_blacklist("jshint"), Err(LoadCopError::LockedPolicy)));
        assert!(matches!(
            store.set_enforcement_level(EnforcementLevel::WhitelistOnly),
            Err(LoadCopError::LockedPolicy)
        ));
        assert!(matches!(store.add_substitution("x", 1.0), Err(LoadCopError::LockedPolicy)));
        lock.unlock();

        assert!(!store.is_locked());
        store.add_to_blacklist("console").unwrap();
        store.remove_from_blacklist("jshint").unwrap();
        assert_eq!(store.blacklist().into_iter().collect::<Vec<_>>(), vec!["console".to_string()]);
    }

    #[test]
    fn locks_nest() {
        let store = PolicyStore::new();
        let outer = store.lock();
        {
            let _inner = store.lock();
        }
        assert!(store.is_locked());
        drop(outer);
        assert!(!store.is_locked());
    }

    #[test]
    fn readers_return_copies() {
        let store = PolicyStore::new();
        store.add_to_whitelist("exit").unwrap();
        let mut copy = store.whitelist();
        copy.insert("console".into());
        assert!(!store.whitelist().contains("console"));

        let mut subs = store.substitutions();
        subs.insert("jshint".into(), Value::Null);
        assert!(store.substitutions().is_empty());
    }

    #[test]
    fn default_level_is_blacklist_only() {
        assert_eq!(PolicyStore::new().enforcement_level(), EnforcementLevel::BlacklistOnly);
    }
}
