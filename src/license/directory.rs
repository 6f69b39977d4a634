use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::LicenseSource;
use crate::models::{LicenseText, PackageMetadata, Provenance};

/// Reads the license file shipped inside an installed package directory.
///
/// Only meaningful for ecosystems that keep packages on disk (NuGet's global
/// packages folder); metadata without a `package_dir` is skipped.
pub struct DirectorySource;

#[async_trait]
impl LicenseSource for DirectorySource {
    fn name(&self) -> &'static str {
        "directory"
    }

    async fn lookup(&self, metadata: &PackageMetadata) -> Option<LicenseText> {
        let dir = metadata.package_dir.as_deref()?;
        read_license_file(dir)
    }
}

/// First readable `license*` file (case-insensitive) in `dir`, by file name.
pub fn read_license_file(dir: &Path) -> Option<LicenseText> {
    for path in license_candidates(dir) {
        match std::fs::read(&path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    if let Some(license) = LicenseText::new(text, Provenance::LocalFile) {
                        return Some(license);
                    }
                }
                Err(_) => log::debug!("{}: not valid UTF-8", path.display()),
            },
            Err(e) => log::debug!("{}: {e}", path.display()),
        }
    }
    None
}

fn license_candidates(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_lowercase().starts_with("license"))
                .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates
}
