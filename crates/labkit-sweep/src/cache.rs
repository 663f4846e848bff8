//! Deterministic cache-path resolution and the function-cache probe.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use labkit_core::errors::{ErrorInfo, LabError};
use labkit_core::hash::dict_hash;
use labkit_core::serde::from_json_slice;

/// Stable identity of a callable: the module it lives in plus its name.
///
/// Replaces the (defining-file, function-name) pair used when a runtime can
/// ask a function where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncId {
    /// Module or file stem the callable belongs to.
    pub module: String,
    /// Callable name.
    pub name: String,
}

impl FuncId {
    /// Creates a function identity.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Path fragment unique to this identity: `<module>/<name>`.
    pub fn savedir(&self) -> PathBuf {
        PathBuf::from(&self.module).join(&self.name)
    }
}

/// Normalizes a file extension so it starts with a dot.
pub fn normalize_extension(extension: &str) -> String {
    let trimmed = extension.trim();
    if trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{trimmed}")
    }
}

/// Resolves the persisted-cell path for a call signature:
/// `<prefix>/<module>/<name>/<signature><extension>`.
pub fn cell_path(prefix: &Path, id: &FuncId, signature: &str, extension: &str) -> PathBuf {
    prefix
        .join(id.savedir())
        .join(format!("{signature}{extension}"))
}

/// Creates the parent directory chain of `path`; succeeds if it exists.
pub fn ensure_parent(path: &Path) -> Result<(), LabError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            LabError::Io(
                ErrorInfo::new("cache_dir", "failed to create cache directory")
                    .with_context("path", parent.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
    }
    Ok(())
}

/// Resolves a function's aggregate-cache file and optionally loads it.
///
/// The path is `<cache_root>/<module>/<name>` when no keyword hash applies,
/// otherwise `<cache_root>/<module>/<name>/<dict_hash(kw, salt)>`. The
/// directory chain is created idempotently. Returns the deserialized
/// payload (when present, loadable, and `load` is set) and the resolved
/// path. A present but undeserializable file is reported as an error so the
/// caller can decide whether to treat it as a miss.
pub fn check_function_cache<T: DeserializeOwned>(
    cache_root: &Path,
    id: &FuncId,
    kw: &BTreeMap<String, Value>,
    salt: Option<&str>,
    load: bool,
) -> Result<(Option<T>, PathBuf), LabError> {
    let mut path = cache_root.join(id.savedir());
    if !kw.is_empty() || salt.is_some() {
        path = path.join(dict_hash(kw, salt)?);
    }
    ensure_parent(&path)?;
    if load && path.exists() {
        let bytes = fs::read(&path).map_err(|err| {
            LabError::Io(
                ErrorInfo::new("cache_read", "failed to read cache file")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        let value = from_json_slice(&bytes)?;
        return Ok((Some(value), path));
    }
    Ok((None, path))
}
