use loadcop_core::level::EnforcementLevel;
use loadcop_core::reference::is_named_reference;

use crate::host::Ancestor;

use super::PolicySnapshot;

/// Decision for one named request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Permit,
    Deny { rule: &'static str },
}

impl PolicyDecision {
    pub fn is_permit(&self) -> bool {
        matches!(self, PolicyDecision::Permit)
    }
}

/// Evaluate a named `request` made by the module chain `ancestry` (nearest
/// first). Path requests must not be passed here; they are never governed.
pub fn evaluate(policy: &PolicySnapshot, request: &str, ancestry: &[Ancestor]) -> PolicyDecision {
    match policy.level {
        EnforcementLevel::WhitelistOnly => {
            let requested_by_whitelisted = ancestry
                .iter()
                .any(|a| !a.request.is_empty() && policy.is_whitelisted(&a.request));
            if policy.is_whitelisted(request) || requested_by_whitelisted {
                PolicyDecision::Permit
            } else {
                PolicyDecision::Deny { rule: "not whitelisted" }
            }
        }
        EnforcementLevel::BlacklistOnly => {
            if policy.is_blacklisted(request) {
                PolicyDecision::Deny { rule: "blacklisted" }
            } else {
                PolicyDecision::Permit
            }
        }
        EnforcementLevel::WhitelistPrecedence => {
            if !policy.is_blacklisted(request) {
                return PolicyDecision::Permit;
            }
            let overridden = ancestry
                .iter()
                .any(|a| is_named_reference(&a.name) && policy.is_whitelisted(&a.name));
            if overridden {
                PolicyDecision::Permit
            } else {
                PolicyDecision::Deny { rule: "blacklisted without whitelisted ancestor" }
            }
        }
        // Sessions refuse to start under a reserved level; fail closed anyway.
        EnforcementLevel::WhitelistPrecedenceIndirect => PolicyDecision::Deny { rule: "reserved level" },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(level: EnforcementLevel, white: &[&str], black: &[&str]) -> PolicySnapshot {
        PolicySnapshot {
            level,
            whitelist: white.iter().map(|s| s.to_string()).collect(),
            blacklist: black.iter().map(|s| s.to_string()).collect(),
            ..PolicySnapshot::default()
        }
    }

    fn anc(name: &str, request: &str) -> Ancestor {
        Ancestor { name: name.into(), request: request.into() }
    }

    #[test]
    fn whitelist_only_uses_ancestor_requests() {
        let p = policy(EnforcementLevel::WhitelistOnly, &["logger"], &[]);
        assert!(evaluate(&p, "logger", &[]).is_permit());
        assert!(!evaluate(&p, "console", &[]).is_permit());
        let chain = [anc("/app/packages/logger/util.js", "./util.js"), anc("logger", "logger")];
        assert!(evaluate(&p, "console", &chain).is_permit());
    }

    #[test]
    fn blacklist_only_ignores_whitelist() {
        let p = policy(EnforcementLevel::BlacklistOnly, &["fs"], &["fs"]);
        assert!(!evaluate(&p, "fs", &[]).is_permit());
        assert!(evaluate(&p, "path", &[]).is_permit());
    }

    #[test]
    fn precedence_checks_ancestor_names() {
        let p = policy(EnforcementLevel::WhitelistPrecedence, &["trusted"], &["fs"]);
        assert!(!evaluate(&p, "fs", &[]).is_permit());
        assert!(evaluate(&p, "fs", &[anc("trusted", "trusted")]).is_permit());
        // a path-named ancestor never counts, even if its request matches
        assert!(!evaluate(&p, "fs", &[anc("/app/trusted.js", "trusted")]).is_permit());
        assert!(evaluate(&p, "path", &[]).is_permit());
    }

    #[test]
    fn reserved_level_fails_closed() {
        let p = policy(EnforcementLevel::WhitelistPrecedenceIndirect, &["x"], &[]);
        assert!(!evaluate(&p, "x", &[]).is_permit());
    }
}
