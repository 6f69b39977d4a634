use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cache::{CacheConfig, DEFAULT_NAMESPACE};

/// Root configuration structure, deserialized from `.thirdparty-notice/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheSection,
    pub github: GithubSection,
    pub nuget: NugetSection,
    pub output: OutputSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Parent directory of the cache. Defaults to the platform cache dir.
    pub dir: Option<PathBuf>,
    /// Subdirectory for this tool's entries.
    pub namespace: String,
    /// Entries older than this are fetched again.
    pub expiration_days: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            dir: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            expiration_days: 28,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GithubSection {
    /// Token for api.github.com; raises the rate limit.
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NugetSection {
    /// Global packages folder, if not the NuGet default.
    pub global_packages: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Prefix notice files with the fixed header.
    pub header: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self { header: true }
    }
}

impl Config {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new(
            self.cache.dir.clone().unwrap_or_else(CacheConfig::default_root),
            self.cache.namespace.clone(),
            Duration::from_secs(self.cache.expiration_days.saturating_mul(24 * 60 * 60)),
        )
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<project_dir>/.thirdparty-notice/config.toml`
/// 3. `~/.config/thirdparty-notice/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_dir.join(".thirdparty-notice").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("thirdparty-notice")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
}
