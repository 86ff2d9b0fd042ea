use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use loadcop_core::error::{LoadCopError, Result};
use loadcop_core::level::EnforcementLevel;
use loadcop_core::reference::is_named_reference;
use loadcop_core::value::{ObjectHandle, Value};

use super::scope::{ResourceScope, ScopeStack};
use crate::host::{Host, Loader, ModuleId, Resolution, SELF_REFERENCE};
use crate::obs::EnforcementMetrics;
use crate::policy::{evaluate, PolicyDecision, PolicySnapshot};

/// One session's hooks, stacked on whatever loader was current before it.
pub(crate) struct Interceptor {
    policy: PolicySnapshot,
    previous: Arc<dyn Loader>,
    scopes: Mutex<ScopeStack>,
    loader_clone: OnceLock<ObjectHandle>,
    metrics: Arc<EnforcementMetrics>,
}

impl Interceptor {
    pub(crate) fn new(policy: PolicySnapshot, previous: Arc<dyn Loader>, metrics: Arc<EnforcementMetrics>) -> Self {
        Self {
            policy,
            previous,
            scopes: Mutex::new(ScopeStack::new()),
            loader_clone: OnceLock::new(),
            metrics,
        }
    }

    fn level(&self) -> EnforcementLevel {
        self.policy.level
    }

    fn record(&self, outcome: &str) {
        self.metrics
            .load_decisions
            .inc(&[("level", self.level().as_str()), ("outcome", outcome)]);
    }

    fn check_policy(&self, host: &Host, request: &str, parent: Option<ModuleId>) -> Result<()> {
        let ancestry = host.ancestry(parent);
        match evaluate(&self.policy, request, &ancestry) {
            PolicyDecision::Permit => Ok(()),
            PolicyDecision::Deny { rule } => {
                self.record("denied");
                tracing::warn!(request, level = %self.level(), rule, "load denied by policy");
                Err(LoadCopError::PolicyViolation(request.to_string()))
            }
        }
    }

    /// The self-reference handed to untrusted code: a per-session shallow
    /// clone, so the real loader object's state cannot be reached through it.
    fn loader_object(&self, host: &Host) -> ObjectHandle {
        if self.policy.is_whitelisted(SELF_REFERENCE) {
            return host.loader_object();
        }
        self.loader_clone
            .get_or_init(|| host.loader_object().shallow_clone())
            .clone()
    }
}

impl Loader for Interceptor {
    fn load(&self, host: &Host, request: &str, parent: Option<ModuleId>, is_entry: bool) -> Result<Value> {
        if is_named_reference(request) {
            self.check_policy(host, request, parent)?;

            if let Some(substitute) = self.policy.substitute(request) {
                self.record("substituted");
                tracing::debug!(request, "serving substitute");
                return Ok(substitute.clone());
            }
        }

        if request == SELF_REFERENCE {
            self.record("self_reference");
            return Ok(Value::Object(self.loader_object(host)));
        }

        self.record("permitted");
        self.previous.load(host, request, parent, is_entry)
    }

    fn resolve(&self, host: &Host, request: &str, parent: Option<ModuleId>) -> Result<Resolution> {
        let file = match self.previous.resolve(host, request, parent)? {
            Resolution::File(file) => file,
            // virtual resources never enter the scope stack
            builtin => return Ok(builtin),
        };

        let parent_file: Option<PathBuf> = parent.and_then(|id| host.filename_of(id));
        let covered = {
            let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
            let pushed = is_named_reference(request);
            if pushed {
                scopes.push(ResourceScope::for_file(request, &file));
            }
            scopes.reconcile(&file, parent_file.as_deref(), pushed)
        };

        if self.level() == EnforcementLevel::WhitelistOnly && !covered {
            self.metrics.untrusted_files.inc(&[("level", self.level().as_str())]);
            tracing::warn!(request, path = %file.display(), "file outside any whitelisted tree");
            return Err(LoadCopError::UntrustedTree(file.display().to_string()));
        }

        tracing::debug!(request, path = %file.display(), covered, "resolved");
        Ok(Resolution::File(file))
    }

    fn find_path(&self, host: &Host, request: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
        self.previous.find_path(host, request, search_paths)
    }
}
