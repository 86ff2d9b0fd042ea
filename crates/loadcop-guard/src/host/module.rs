use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use loadcop_core::error::Result;
use loadcop_core::value::Value;

use super::{Environment, Host};

/// Index of a module record in the host arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub(crate) usize);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One instantiated module.
///
/// `parent` points at an older record, so walking it always terminates.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    pub id: ModuleId,
    /// The request for named loads, the resolved file path otherwise.
    pub name: String,
    /// The raw request string that caused this load.
    pub request: String,
    pub filename: PathBuf,
    pub parent: Option<ModuleId>,
    pub is_entry: bool,
    pub exports: Value,
}

/// Identity fields of one ancestor, as seen by the policy engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub name: String,
    pub request: String,
}

/// Executable body of a module file.
pub type ModuleBody = Arc<dyn Fn(&ModuleScope<'_>) -> Result<Value> + Send + Sync>;

/// What a module body sees while it runs.
pub struct ModuleScope<'h> {
    pub(crate) host: &'h Host,
    pub(crate) id: ModuleId,
    pub(crate) filename: &'h Path,
}

impl<'h> ModuleScope<'h> {
    /// Load `request` with this module as the requesting parent.
    pub fn require(&self, request: &str) -> Result<Value> {
        self.host.require_from(request, Some(self.id))
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn filename(&self) -> &Path {
        self.filename
    }

    pub fn globals(&self) -> &Environment {
        self.host.globals()
    }

    pub fn host(&self) -> &'h Host {
        self.host
    }
}
