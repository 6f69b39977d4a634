use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use super::{parse_error, read_manifest};
use crate::error::NoticeError;
use crate::models::{Dependency, Ecosystem};

/// Reads `[project].dependencies` from a `pyproject.toml`.
///
/// Only the distribution name of each requirement is kept; PyPI metadata is
/// always looked up for the latest release, so the version is left empty.
pub struct PythonAnalyzer;

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
struct Pyproject {
    project: Option<PyprojectProject>,
}

#[derive(Debug, Deserialize)]
struct PyprojectProject {
    #[serde(default)]
    dependencies: Vec<String>,
}

impl super::Analyzer for PythonAnalyzer {
    fn analyze(&self, manifest: &Path) -> Result<Vec<Dependency>, NoticeError> {
        let manifest = pyproject_path(manifest);
        let content = read_manifest(&manifest)?;
        let pyproject: Pyproject = toml::from_str(&content).map_err(|e| parse_error(&manifest, e))?;

        let deps = pyproject
            .project
            .map(|p| p.dependencies)
            .unwrap_or_default()
            .iter()
            .filter_map(|requirement| {
                let name = package_name(requirement);
                if name.is_none() {
                    log::warn!("ignoring unparseable requirement {requirement:?}");
                }
                name
            })
            .map(|name| Dependency::new(name, "", Ecosystem::PyPI))
            .collect();

        Ok(deps)
    }
}

/// A project directory stands for the `pyproject.toml` inside it.
fn pyproject_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join("pyproject.toml")
    } else {
        path.to_path_buf()
    }
}

/// Leading distribution name of a PEP 508 requirement:
/// `requests[socks]>=2.0 ; python_version > "3.8"` → `requests`.
pub fn package_name(requirement: &str) -> Option<&str> {
    static NAME: OnceLock<Option<Regex>> = OnceLock::new();
    let re = NAME
        .get_or_init(|| Regex::new(r"^([A-Za-z0-9_.\-]+)").ok())
        .as_ref()?;
    re.captures(requirement.trim_start())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
