use std::path::Path;

use crate::error::NoticeError;
use crate::models::{Dependency, Ecosystem};

pub mod dotnet;
pub mod python;
pub mod rust;

/// Reads a project's declared direct dependencies, in declaration order.
pub trait Analyzer {
    fn analyze(&self, manifest: &Path) -> Result<Vec<Dependency>, NoticeError>;
}

/// Manifest reader for `ecosystem`.
pub fn for_ecosystem(ecosystem: Ecosystem) -> Box<dyn Analyzer> {
    match ecosystem {
        Ecosystem::Cargo => Box::new(rust::RustAnalyzer::new()),
        Ecosystem::PyPI => Box::new(python::PythonAnalyzer::new()),
        Ecosystem::NuGet => Box::new(dotnet::DotNetAnalyzer::new()),
    }
}

/// Read a manifest, mapping a missing file to [`NoticeError::ManifestNotFound`].
pub(crate) fn read_manifest(path: &Path) -> Result<String, NoticeError> {
    if !path.is_file() {
        return Err(NoticeError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| parse_error(path, e))
}

pub(crate) fn parse_error(path: &Path, details: impl std::fmt::Display) -> NoticeError {
    NoticeError::ManifestParse {
        path: path.to_path_buf(),
        details: details.to_string(),
    }
}
