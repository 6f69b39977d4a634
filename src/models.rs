use std::path::PathBuf;

/// A packaging system with its own manifest format and registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ecosystem {
    Cargo,
    PyPI,
    NuGet,
}

impl Ecosystem {
    /// Stable lowercase prefix used in cache keys.
    pub fn slug(&self) -> &'static str {
        match self {
            Ecosystem::Cargo => "cargo",
            Ecosystem::PyPI => "pypi",
            Ecosystem::NuGet => "nuget",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Cargo => write!(f, "Cargo"),
            Ecosystem::PyPI => write!(f, "PyPI"),
            Ecosystem::NuGet => write!(f, "NuGet"),
        }
    }
}

/// A direct dependency declared by the project manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// May be empty when the manifest does not pin a version (Python).
    pub version: String,
    pub ecosystem: Ecosystem,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>, ecosystem: Ecosystem) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ecosystem,
        }
    }

    /// Identifier shown in progress output and in the failure list.
    pub fn id(&self) -> String {
        if self.version.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.name, self.version)
        }
    }

    /// Per-package cache key. The ecosystem prefix keeps a crate and a NuGet
    /// package sharing a name and version apart.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.ecosystem.slug(), self.name, self.version)
    }
}

/// Facts a registry (or local package store) declares about one package.
///
/// Fields are empty strings when the upstream source omits them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub copyright: String,
    pub license_identifier: String,
    pub repository_url: String,
    /// Directory of the already-installed package, for ecosystems that keep one.
    pub package_dir: Option<PathBuf>,
}

/// Which license source produced a [`LicenseText`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    LocalFile,
    Repository,
    Spdx,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::LocalFile => write!(f, "local file"),
            Provenance::Repository => write!(f, "repository"),
            Provenance::Spdx => write!(f, "spdx"),
        }
    }
}

/// A resolved, non-empty license text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseText {
    text: String,
    provenance: Provenance,
}

impl LicenseText {
    /// Returns `None` for empty or whitespace-only text: an empty license is
    /// a failed lookup, not a valid result.
    pub fn new(text: impl Into<String>, provenance: Provenance) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return None;
        }
        Some(Self { text, provenance })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
}

/// One fully resolved notice entry.
///
/// Only constructible from a [`LicenseText`], so a record never carries an
/// empty license.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeRecord {
    pub package_name: String,
    pub version: String,
    pub license_identifier: String,
    pub repository_url: String,
    pub license_text: String,
}

impl NoticeRecord {
    pub fn new(metadata: &PackageMetadata, license: &LicenseText) -> Self {
        Self {
            package_name: metadata.name.clone(),
            version: metadata.version.clone(),
            license_identifier: metadata.license_identifier.clone(),
            repository_url: metadata.repository_url.clone(),
            license_text: license.text().to_string(),
        }
    }
}
