use std::path::{Path, PathBuf};

use loadcop_core::error::{LoadCopError, Result};
use loadcop_core::reference::{is_named_reference, normalize};
use loadcop_core::value::Value;

use super::{Host, Loader, ModuleId, Resolution, PACKAGES_DIR};

/// The host's own loading algorithm. Sits at the bottom of every hook stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl Loader for NativeLoader {
    fn load(&self, host: &Host, request: &str, parent: Option<ModuleId>, is_entry: bool) -> Result<Value> {
        match host.resolve(request, parent)? {
            Resolution::Builtin(name) => host
                .builtin(&name)
                .ok_or_else(|| LoadCopError::NotFound(name)),
            Resolution::File(path) => host.instantiate(request, &path, parent, is_entry),
        }
    }

    fn resolve(&self, host: &Host, request: &str, parent: Option<ModuleId>) -> Result<Resolution> {
        if host.is_builtin(request) {
            return Ok(Resolution::Builtin(request.to_string()));
        }

        let base = host.search_base(parent);
        let search_paths = if is_named_reference(request) {
            package_dirs(&base)
        } else {
            // absolute requests replace the base when joined
            vec![base]
        };

        host.find_path(request, &search_paths)
            .map(Resolution::File)
            .ok_or_else(|| LoadCopError::NotFound(request.to_string()))
    }

    fn find_path(&self, host: &Host, request: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
        for dir in search_paths {
            let candidate = normalize(&dir.join(request));
            if host.has_file(&candidate) {
                return Some(candidate);
            }
            for ext in host.extensions() {
                let with_ext = PathBuf::from(format!("{}{ext}", candidate.display()));
                if host.has_file(&with_ext) {
                    return Some(with_ext);
                }
            }
            for ext in host.extensions() {
                let index = candidate.join(format!("index{ext}"));
                if host.has_file(&index) {
                    return Some(index);
                }
            }
        }
        None
    }
}

/// `<dir>/packages` for `dir` and every ancestor, nearest first. Directories
/// that already are package directories are skipped.
fn package_dirs(base: &Path) -> Vec<PathBuf> {
    base.ancestors()
        .filter(|dir| dir.file_name().map_or(true, |name| name != PACKAGES_DIR))
        .map(|dir| dir.join(PACKAGES_DIR))
        .collect()
}
