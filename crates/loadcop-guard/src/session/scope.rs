use std::path::{Path, PathBuf};

use loadcop_core::reference::{is_within, split_file};

/// A named request bound to the directory its file resolved into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub name: String,
    pub directory: PathBuf,
    pub file_name: String,
}

impl ResourceScope {
    pub fn for_file(name: impl Into<String>, file: &Path) -> Self {
        let (directory, file_name) = split_file(file);
        Self {
            name: name.into(),
            directory,
            file_name,
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        is_within(path, &self.directory)
    }
}

/// Attributes file resolutions to the named resources whose trees they
/// belong to. Grows on named resolutions, shrinks only by truncation.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<ResourceScope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: ResourceScope) {
        self.scopes.push(scope);
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scopes(&self) -> &[ResourceScope] {
        &self.scopes
    }

    /// Attribute `file` (requested from `parent_file`) to a scope.
    ///
    /// A scope covers `file` when it contains it and either was pushed by
    /// this same resolution (`pushed`) or also contains the parent's file.
    /// Newest to oldest, the first such scope wins and everything pushed
    /// after it is dropped. Without a covering scope, the stack is cut back
    /// to the newest scope containing the parent's file.
    /// Returns whether `file` was covered.
    pub fn reconcile(&mut self, file: &Path, parent_file: Option<&Path>, pushed: bool) -> bool {
        let newest = self.scopes.len().checked_sub(1);
        let mut covering = None;
        let mut parent_index = None;
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            let holds_parent = parent_file.is_some_and(|p| scope.contains(p));
            let just_pushed = pushed && Some(i) == newest;
            if scope.contains(file) && (just_pushed || holds_parent) {
                covering = Some(i);
                break;
            }
            if parent_index.is_none() && holds_parent {
                parent_index = Some(i);
            }
        }
        match (covering, parent_index) {
            (Some(i), _) => {
                self.scopes.truncate(i + 1);
                true
            }
            (None, Some(i)) => {
                self.scopes.truncate(i + 1);
                false
            }
            (None, None) => false,
        }
    }
}
