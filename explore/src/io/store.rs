//! Layout and helpers for the file-backed explore store.
//!
//! ```text
//! <data_dir>/permalinks/<key>.json
//! <data_dir>/form_data/<key>.json
//! <data_dir>/slices.json
//! <data_dir>/datasources.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tracing::debug;

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid store key pattern"));

/// All canonical paths within a store directory.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
    pub permalinks_dir: PathBuf,
    pub form_data_dir: PathBuf,
    pub slices_path: PathBuf,
    pub datasources_path: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            permalinks_dir: root.join("permalinks"),
            form_data_dir: root.join("form_data"),
            slices_path: root.join("slices.json"),
            datasources_path: root.join("datasources.json"),
            root,
        }
    }

    /// Path of a permalink entry, or `None` when the key cannot name a file.
    pub fn permalink_path(&self, key: &str) -> Option<PathBuf> {
        is_valid_key(key).then(|| self.permalinks_dir.join(format!("{key}.json")))
    }

    /// Path of a cached form-data entry, or `None` when the key cannot name a file.
    pub fn form_data_path(&self, key: &str) -> Option<PathBuf> {
        is_valid_key(key).then(|| self.form_data_dir.join(format!("{key}.json")))
    }
}

/// Store keys are restricted to `[A-Za-z0-9_-]+` so they map to plain file names.
pub fn is_valid_key(key: &str) -> bool {
    KEY_PATTERN.is_match(key)
}

/// Read a file, treating absence as a clean miss.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        debug!(path = %path.display(), "store entry missing");
        return Ok(None);
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    Ok(Some(contents))
}

/// Options for `init_store`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, reset the slice and datasource indexes to empty lists.
    pub force: bool,
}

/// Create the store scaffolding under `root`.
pub fn init_store(root: &Path, options: &InitOptions) -> Result<StorePaths> {
    let paths = StorePaths::new(root);
    if paths.root.exists() && !paths.root.is_dir() {
        return Err(anyhow!("expected directory {}", paths.root.display()));
    }
    for dir in [&paths.permalinks_dir, &paths.form_data_dir] {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
    }
    for index in [&paths.slices_path, &paths.datasources_path] {
        if options.force || !index.exists() {
            fs::write(index, "[]\n").with_context(|| format!("write {}", index.display()))?;
        }
    }
    Ok(paths)
}
