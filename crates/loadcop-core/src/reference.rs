//! Request classification and path helpers.
//!
//! A *named* reference is a bare identifier (`exit`, `console`) and is governed
//! by policy. A *path* reference (`./lib/a.js`, `../x`, `/abs`, `C:\x`, `\\x`)
//! is never subject to policy or substitution.

use std::path::{Component, Path, PathBuf};

/// True iff `request` is a bare identifier rather than a path.
pub fn is_named_reference(request: &str) -> bool {
    let mut chars = request.chars();
    match chars.next() {
        Some('.') | Some('/') | Some('\\') => false,
        Some(c) if c.is_ascii_alphabetic() => chars.next() != Some(':'),
        _ => true,
    }
}

/// True iff `request` is relative (`.`-prefixed) or absolute.
pub fn is_path_reference(request: &str) -> bool {
    !is_named_reference(request)
}

/// Fold `.` and `..` components lexically. Never touches the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True iff `path` lies under `dir` (component-wise, after normalization).
pub fn is_within(path: &Path, dir: &Path) -> bool {
    normalize(path).starts_with(normalize(dir))
}

/// Split a resolved file path into its directory and file name.
pub fn split_file(path: &Path) -> (PathBuf, String) {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir, file)
}
