//! In-memory module host.
//!
//! The host is the loading subsystem the enforcement layer sits in front of.
//! It resolves requests against a virtual file table and a builtin table,
//! keeps an arena of instantiated modules linked by parent ids, caches
//! exports by resolved path, and owns the global [`Environment`].
//!
//! Every request enters through [`HookStack::current`], so installed
//! interceptors see loads, resolutions and path searches made by the host's
//! own loader as well as by callers.

mod env;
mod loader;
mod module;
mod native;

pub use env::Environment;
pub use loader::{ExtensionPoint, HookGuard, HookStack, Loader, Resolution};
pub use module::{Ancestor, ModuleBody, ModuleId, ModuleRecord, ModuleScope};
pub use native::NativeLoader;

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;

use loadcop_core::error::{LoadCopError, Result};
use loadcop_core::reference::{is_named_reference, split_file};
use loadcop_core::value::{ObjectHandle, Value};

/// Identifier under which the host exposes its own loader object.
pub const SELF_REFERENCE: &str = "module";

/// Directory name searched for named requests, in every ancestor directory.
pub const PACKAGES_DIR: &str = "packages";

pub struct Host {
    hooks: HookStack,
    modules: RwLock<Vec<ModuleRecord>>,
    cache: DashMap<PathBuf, ModuleId>,
    files: DashMap<PathBuf, ModuleBody>,
    builtins: DashMap<String, Value>,
    loader_object: ObjectHandle,
    globals: Environment,
    root: PathBuf,
    extensions: Vec<String>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Host whose top-level requests resolve relative to `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self::with_loader(root, Arc::new(NativeLoader))
    }

    /// Host with a custom bottom-of-stack loader.
    pub fn with_loader(root: impl Into<PathBuf>, base: Arc<dyn Loader>) -> Self {
        let root = root.into();
        let loader_object = ObjectHandle::new();
        loader_object
            .insert("root", root.display().to_string())
            .insert("builtin_modules", ObjectHandle::new());

        let host = Self {
            hooks: HookStack::new(base),
            modules: RwLock::new(Vec::new()),
            cache: DashMap::new(),
            files: DashMap::new(),
            builtins: DashMap::new(),
            loader_object: loader_object.clone(),
            globals: Environment::new(),
            root,
            extensions: Vec::new(),
        };
        host.add_builtin(SELF_REFERENCE, loader_object);
        host.with_extensions(&[".js"])
    }

    /// Suffixes probed when a request names a file without its extension.
    pub fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        let listed: Vec<serde_json::Value> = extensions.iter().map(|e| (*e).into()).collect();
        let listed = Value::from_json(&serde_json::Value::Array(listed));
        if let Err(e) = self.loader_object.set("extensions", listed) {
            tracing::warn!(error = %e, "loader object rejected extensions list");
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn hooks(&self) -> &HookStack {
        &self.hooks
    }

    pub fn globals(&self) -> &Environment {
        &self.globals
    }

    /// The real loader object, as returned for [`SELF_REFERENCE`].
    pub fn loader_object(&self) -> ObjectHandle {
        self.loader_object.clone()
    }

    pub fn add_builtin(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        if let Some(listed) = self.loader_object.get("builtin_modules").as_object() {
            if let Err(e) = listed.set(name.as_str(), true) {
                tracing::warn!(builtin = %name, error = %e, "builtin registered but not listed");
            }
        }
        self.builtins.insert(name, value.into());
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    pub fn builtin(&self, name: &str) -> Option<Value> {
        self.builtins.get(name).map(|v| v.value().clone())
    }

    /// Register a module file whose body runs on first load.
    pub fn add_file<F>(&self, path: impl Into<PathBuf>, body: F)
    where
        F: Fn(&ModuleScope<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        self.files.insert(path.into(), Arc::new(body));
    }

    /// Register a module file that simply exports `value`.
    pub fn add_value_file(&self, path: impl Into<PathBuf>, value: impl Into<Value>) {
        let value = value.into();
        self.add_file(path, move |_| Ok(value.clone()));
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    /// Load `request` from top level (no requesting module).
    pub fn require(&self, request: &str) -> Result<Value> {
        self.require_from(request, None)
    }

    pub fn require_from(&self, request: &str, parent: Option<ModuleId>) -> Result<Value> {
        self.hooks.current().load(self, request, parent, false)
    }

    /// Load `request` as the program entry point.
    pub fn load_entry(&self, request: &str) -> Result<Value> {
        self.hooks.current().load(self, request, None, true)
    }

    pub fn resolve(&self, request: &str, parent: Option<ModuleId>) -> Result<Resolution> {
        self.hooks.current().resolve(self, request, parent)
    }

    pub fn find_path(&self, request: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
        self.hooks.current().find_path(self, request, search_paths)
    }

    pub fn module(&self, id: ModuleId) -> Option<ModuleRecord> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0)
            .cloned()
    }

    pub fn module_count(&self) -> usize {
        self.modules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Cached module for a resolved path, if any.
    pub fn cached(&self, path: &Path) -> Option<ModuleId> {
        self.cache.get(path).map(|e| *e.value())
    }

    /// `parent` and its ancestors, nearest first.
    pub fn ancestry(&self, parent: Option<ModuleId>) -> Vec<Ancestor> {
        let modules = self.modules.read().unwrap_or_else(PoisonError::into_inner);
        let mut chain = Vec::new();
        let mut cursor = parent;
        while let Some(id) = cursor {
            let Some(record) = modules.get(id.0) else { break };
            chain.push(Ancestor {
                name: record.name.clone(),
                request: record.request.clone(),
            });
            // parents are always older records
            cursor = record.parent.filter(|p| p.0 < id.0);
        }
        chain
    }

    pub fn filename_of(&self, id: ModuleId) -> Option<PathBuf> {
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.0)
            .map(|m| m.filename.clone())
    }

    /// Directory relative requests from `parent` resolve against.
    pub(crate) fn search_base(&self, parent: Option<ModuleId>) -> PathBuf {
        parent
            .and_then(|id| self.filename_of(id))
            .map(|f| split_file(&f).0)
            .unwrap_or_else(|| self.root.clone())
    }

    /// Run the body of `path` once and cache its exports.
    pub(crate) fn instantiate(
        &self,
        request: &str,
        path: &Path,
        parent: Option<ModuleId>,
        is_entry: bool,
    ) -> Result<Value> {
        if let Some(id) = self.cached(path) {
            return Ok(self.module(id).map(|m| m.exports).unwrap_or_default());
        }

        let body = self
            .files
            .get(path)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| LoadCopError::NotFound(path.display().to_string()))?;

        let name = if is_named_reference(request) {
            request.to_string()
        } else {
            path.display().to_string()
        };

        let id = {
            let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
            let id = ModuleId(modules.len());
            modules.push(ModuleRecord {
                id,
                name,
                request: request.to_string(),
                filename: path.to_path_buf(),
                parent,
                is_entry,
                exports: Value::Undefined,
            });
            id
        };
        self.cache.insert(path.to_path_buf(), id);
        tracing::debug!(module = %id, request, path = %path.display(), "instantiating module");

        let scope = ModuleScope { host: self, id, filename: path };
        match body(&scope) {
            Ok(exports) => {
                let mut modules = self.modules.write().unwrap_or_else(PoisonError::into_inner);
                if let Some(record) = modules.get_mut(id.0) {
                    record.exports = exports.clone();
                }
                Ok(exports)
            }
            Err(e) => {
                self.cache.remove(path);
                Err(e)
            }
        }
    }
}
