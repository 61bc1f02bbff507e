//! Explore configuration stored in `explore.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::request_params::DEFAULT_IGNORED_PARAMS;

/// Explore configuration (TOML).
///
/// Missing fields fall back to defaults so a partial file stays valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExploreConfig {
    /// Root of the file-backed store. Relative paths resolve against the
    /// directory holding the config file.
    pub data_dir: PathBuf,

    pub request_params: RequestParamsConfig,

    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RequestParamsConfig {
    /// Query parameters never copied into `url_params`.
    pub ignored: Vec<String>,
}

impl Default for RequestParamsConfig {
    fn default() -> Self {
        Self {
            ignored: DEFAULT_IGNORED_PARAMS.iter().map(|key| key.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3002,
        }
    }
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            request_params: RequestParamsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl ExploreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(anyhow!("data_dir must not be empty"));
        }
        if self.request_params.ignored.iter().any(|key| key.trim().is_empty()) {
            return Err(anyhow!("request_params.ignored must not contain empty keys"));
        }
        if self.server.bind.trim().is_empty() {
            return Err(anyhow!("server.bind must not be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be > 0"));
        }
        Ok(())
    }

    /// Data directory, anchored at `config_path`'s parent when relative.
    pub fn resolve_data_dir(&self, config_path: &Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            return self.data_dir.clone();
        }
        match config_path.parent() {
            Some(parent) => parent.join(&self.data_dir),
            None => self.data_dir.clone(),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ExploreConfig::default()`.
pub fn load_config(path: &Path) -> Result<ExploreConfig> {
    if !path.exists() {
        let cfg = ExploreConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ExploreConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ExploreConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
