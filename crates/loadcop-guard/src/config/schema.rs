use std::collections::BTreeMap;

use serde::Deserialize;

use loadcop_core::error::{LoadCopError, Result};
use loadcop_core::level::EnforcementLevel;
use loadcop_core::reference::is_named_reference;
use loadcop_core::value::Value;

use crate::globals::GlobalCatalog;
use crate::policy::PolicyStore;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    pub version: u32,

    #[serde(default)]
    pub enforcement_level: EnforcementLevel,

    #[serde(default)]
    pub whitelist: Vec<String>,

    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Values served in place of the named modules, given as JSON-shaped YAML.
    #[serde(default)]
    pub substitutions: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub globals: GlobalsSection,
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(LoadCopError::BadConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        if self.enforcement_level.is_reserved() {
            return Err(LoadCopError::ReservedLevel(self.enforcement_level));
        }

        check_names("whitelist", self.whitelist.iter())?;
        check_names("blacklist", self.blacklist.iter())?;
        check_names("substitutions", self.substitutions.keys())?;

        self.globals.validate()
    }

    /// Build a store holding this configuration. The store starts unlocked.
    pub fn into_store(self) -> Result<PolicyStore> {
        let store = PolicyStore::new();
        store.set_enforcement_level(self.enforcement_level)?;
        for name in self.whitelist {
            store.add_to_whitelist(name)?;
        }
        for name in self.blacklist {
            store.add_to_blacklist(name)?;
        }
        for (name, json) in &self.substitutions {
            store.add_substitution(name.as_str(), Value::from_json(json))?;
        }
        if let Some(catalog) = self.globals.into_catalog() {
            store.protect_globals(catalog)?;
        }
        Ok(store)
    }
}

fn check_names<'a>(field: &str, names: impl Iterator<Item = &'a String>) -> Result<()> {
    for name in names {
        if name.is_empty() || !is_named_reference(name) {
            return Err(LoadCopError::BadConfig(format!(
                "{field} entry {name:?} must be a non-empty module name"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalsSection {
    #[serde(default)]
    pub protect: bool,

    /// Falls back to [`GlobalCatalog::standard`] when omitted.
    #[serde(default)]
    pub catalog: Option<GlobalCatalog>,
}

impl GlobalsSection {
    pub fn validate(&self) -> Result<()> {
        if !self.protect && self.catalog.is_some() {
            return Err(LoadCopError::BadConfig(
                "globals.catalog requires globals.protect: true".into(),
            ));
        }
        Ok(())
    }

    pub fn into_catalog(self) -> Option<GlobalCatalog> {
        if !self.protect {
            return None;
        }
        Some(self.catalog.unwrap_or_else(GlobalCatalog::standard))
    }
}
