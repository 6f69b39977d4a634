use std::path::Path;

use serde::Deserialize;
use toml::{Table, Value};

use super::{parse_error, read_manifest};
use crate::error::NoticeError;
use crate::models::{Dependency, Ecosystem};

#[derive(Debug, Deserialize)]
struct CargoManifest {
    #[serde(default)]
    dependencies: Table,
    workspace: Option<CargoWorkspace>,
}

#[derive(Debug, Deserialize)]
struct CargoWorkspace {
    #[serde(default)]
    dependencies: Table,
}

/// Reads `[dependencies]` from a `Cargo.toml`.
///
/// Dependencies without a registry version (path or git only) are skipped.
/// `workspace = true` entries take their version from
/// `[workspace.dependencies]` when the same manifest declares it.
pub struct RustAnalyzer;

impl RustAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for RustAnalyzer {
    fn analyze(&self, manifest: &Path) -> Result<Vec<Dependency>, NoticeError> {
        let content = read_manifest(manifest)?;
        let parsed: CargoManifest = toml::from_str(&content).map_err(|e| parse_error(manifest, e))?;
        Ok(dependencies(&parsed))
    }
}

fn dependencies(manifest: &CargoManifest) -> Vec<Dependency> {
    let workspace = manifest.workspace.as_ref().map(|w| &w.dependencies);

    manifest
        .dependencies
        .iter()
        .filter_map(|(key, value)| {
            let resolved = match value {
                Value::Table(t) if t.get("workspace").and_then(Value::as_bool) == Some(true) => {
                    workspace.and_then(|ws| ws.get(key)).unwrap_or(value)
                }
                _ => value,
            };
            let dep = requirement(key, resolved);
            if dep.is_none() {
                log::debug!("skipping {key}: no registry version");
            }
            dep
        })
        .collect()
}

/// `(crate name, version)` of one dependency entry; `package` renames win.
fn requirement(key: &str, value: &Value) -> Option<Dependency> {
    match value {
        Value::String(version) => Some(Dependency::new(key, version.trim(), Ecosystem::Cargo)),
        Value::Table(t) => {
            let version = t.get("version").and_then(Value::as_str)?;
            let name = t.get("package").and_then(Value::as_str).unwrap_or(key);
            Some(Dependency::new(name, version.trim(), Ecosystem::Cargo))
        }
        _ => None,
    }
}
