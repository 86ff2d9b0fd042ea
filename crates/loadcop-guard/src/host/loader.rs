use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use loadcop_core::error::Result;
use loadcop_core::value::Value;

use super::{Host, ModuleId};

/// The three interceptable extension points of a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPoint {
    Load,
    Resolve,
    FindPath,
}

impl ExtensionPoint {
    pub const ALL: [ExtensionPoint; 3] = [
        ExtensionPoint::Load,
        ExtensionPoint::Resolve,
        ExtensionPoint::FindPath,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExtensionPoint::Load => "load",
            ExtensionPoint::Resolve => "resolve",
            ExtensionPoint::FindPath => "find_path",
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A virtual resource provided by the host itself. Never a file.
    Builtin(String),
    /// A module file.
    File(PathBuf),
}

impl Resolution {
    pub fn file(&self) -> Option<&Path> {
        match self {
            Resolution::File(p) => Some(p),
            Resolution::Builtin(_) => None,
        }
    }
}

/// A loader implementation, or an interceptor stacked on top of one.
///
/// Implementations that call back into the host (for example a load that
/// resolves) must go through the host so the *current* hooks apply.
pub trait Loader: Send + Sync {
    fn load(&self, host: &Host, request: &str, parent: Option<ModuleId>, is_entry: bool) -> Result<Value>;

    fn resolve(&self, host: &Host, request: &str, parent: Option<ModuleId>) -> Result<Resolution>;

    /// `None` means "not found here, continue the standard algorithm".
    fn find_path(&self, host: &Host, request: &str, search_paths: &[PathBuf]) -> Option<PathBuf>;

    fn supports(&self, _point: ExtensionPoint) -> bool {
        true
    }
}

/// Explicit stack of installed loaders on top of the host's own loader,
/// which is never popped.
pub struct HookStack {
    base: Arc<dyn Loader>,
    frames: RwLock<Vec<Arc<dyn Loader>>>,
}

impl HookStack {
    pub fn new(base: Arc<dyn Loader>) -> Self {
        Self {
            base,
            frames: RwLock::new(Vec::new()),
        }
    }

    /// The loader currently receiving requests.
    pub fn current(&self) -> Arc<dyn Loader> {
        self.frames
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.base))
    }

    /// Number of frames including the base loader.
    pub fn depth(&self) -> usize {
        self.frames.read().unwrap_or_else(PoisonError::into_inner).len() + 1
    }

    /// Push `loader`. The returned guard restores the previous frame on drop,
    /// including during unwinding.
    #[must_use = "dropping the guard uninstalls the loader immediately"]
    pub fn install(&self, loader: Arc<dyn Loader>) -> HookGuard<'_> {
        let mut frames = self.frames.write().unwrap_or_else(PoisonError::into_inner);
        let restore_to = frames.len();
        frames.push(loader);
        tracing::debug!(depth = restore_to + 2, "loader hooks installed");
        HookGuard { stack: self, restore_to }
    }
}

/// Scoped installation of one loader frame.
pub struct HookGuard<'a> {
    stack: &'a HookStack,
    restore_to: usize,
}

impl HookGuard<'_> {
    /// Stack depth while this frame is on top.
    pub fn depth(&self) -> usize {
        self.restore_to + 2
    }
}

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        let mut frames = self.stack.frames.write().unwrap_or_else(PoisonError::into_inner);
        if frames.len() != self.restore_to + 1 {
            tracing::warn!(
                expected = self.restore_to + 1,
                actual = frames.len(),
                "loader hooks released out of order"
            );
        }
        frames.truncate(self.restore_to);
        tracing::debug!(depth = frames.len() + 1, "loader hooks restored");
    }
}
