//! Policy config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use loadcop_core::error::{LoadCopError, Result};

pub use schema::{GlobalsSection, PolicyConfig};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<PolicyConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path).map_err(|e| {
        LoadCopError::Internal(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<PolicyConfig> {
    let cfg: PolicyConfig = serde_yaml::from_str(s)
        .map_err(|e| LoadCopError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
