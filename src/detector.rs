use std::path::Path;

use crate::models::Ecosystem;

/// Pick the ecosystem from the project descriptor's file name or extension.
/// A directory holding a `pyproject.toml` is a Python project.
pub fn detect_ecosystem(path: &Path) -> Option<Ecosystem> {
    if path.is_dir() {
        return path
            .join("pyproject.toml")
            .is_file()
            .then_some(Ecosystem::PyPI);
    }

    let file_name = path.file_name()?.to_str()?;
    if file_name == "Cargo.toml" {
        return Some(Ecosystem::Cargo);
    }
    if file_name == "pyproject.toml" {
        return Some(Ecosystem::PyPI);
    }

    let extension = path.extension()?.to_str()?.to_lowercase();
    match extension.as_str() {
        "csproj" | "fsproj" | "vbproj" | "sln" => Some(Ecosystem::NuGet),
        _ => None,
    }
}
