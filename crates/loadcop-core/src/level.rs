//! Enforcement levels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Policy evaluation strategy applied to named requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementLevel {
    /// Only whitelisted names, or names requested from inside a whitelisted
    /// tree, may load. Files outside approved trees are rejected too.
    WhitelistOnly,
    /// Everything loads except blacklisted names.
    #[default]
    BlacklistOnly,
    /// Blacklisted names load only when requested by a whitelisted ancestor.
    WhitelistPrecedence,
    /// Declared, no defined behavior.
    WhitelistPrecedenceIndirect,
}

impl EnforcementLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementLevel::WhitelistOnly => "whitelist_only",
            EnforcementLevel::BlacklistOnly => "blacklist_only",
            EnforcementLevel::WhitelistPrecedence => "whitelist_precedence",
            EnforcementLevel::WhitelistPrecedenceIndirect => "whitelist_precedence_indirect",
        }
    }

    /// Levels that sessions refuse to run under.
    pub fn is_reserved(self) -> bool {
        matches!(self, EnforcementLevel::WhitelistPrecedenceIndirect)
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
