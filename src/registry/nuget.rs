use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::MetadataProvider;
use crate::error::MetadataError;
use crate::models::PackageMetadata;

/// Metadata read from packages already restored into the NuGet global
/// packages folder (`<root>/<id>/<version>/`, both lowercased). No network.
pub struct NugetProvider {
    global_packages: PathBuf,
}

impl NugetProvider {
    pub fn new(global_packages: PathBuf) -> Self {
        Self { global_packages }
    }

    pub fn package_dir(&self, name: &str, version: &str) -> PathBuf {
        self.global_packages
            .join(name.to_lowercase())
            .join(version.to_lowercase())
    }
}

#[async_trait]
impl MetadataProvider for NugetProvider {
    async fn fetch(&self, name: &str, version: &str) -> Result<PackageMetadata, MetadataError> {
        if version.is_empty() {
            return Err(MetadataError::not_found(name, version, "no version declared"));
        }

        let dir = self.package_dir(name, version);
        if !dir.is_dir() {
            return Err(MetadataError::not_found(
                name,
                version,
                format!("{} does not exist", dir.display()),
            ));
        }

        let nuspec = single_nuspec(&dir).map_err(|reason| MetadataError::not_found(name, version, reason))?;
        let content = std::fs::read_to_string(&nuspec)
            .map_err(|e| MetadataError::malformed(name, format!("{}: {e}", nuspec.display())))?;
        let meta = parse_nuspec(&content)
            .map_err(|e| MetadataError::malformed(name, format!("{}: {e}", nuspec.display())))?;

        let repository = meta.repository_url.or(meta.project_url).unwrap_or_default();
        Ok(PackageMetadata {
            name: meta.id.unwrap_or_else(|| name.to_string()),
            version: meta.version.unwrap_or_else(|| version.to_string()),
            author: meta.authors.unwrap_or_default(),
            copyright: meta.copyright.unwrap_or_default(),
            license_identifier: meta.license_expression.unwrap_or_default(),
            repository_url: repository,
            package_dir: Some(dir),
        })
    }
}

/// The one `*.nuspec` in a package directory.
fn single_nuspec(dir: &Path) -> Result<PathBuf, String> {
    let entries = std::fs::read_dir(dir).map_err(|e| e.to_string())?;
    let mut nuspecs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("nuspec"))
                    .unwrap_or(false)
        })
        .collect();

    match nuspecs.len() {
        1 => Ok(nuspecs.remove(0)),
        0 => Err(format!("no .nuspec in {}", dir.display())),
        n => Err(format!("{n} .nuspec files in {}", dir.display())),
    }
}

/// Fields of `<package><metadata>` in a `.nuspec`.
#[derive(Debug, Default, PartialEq)]
pub struct Nuspec {
    pub id: Option<String>,
    pub version: Option<String>,
    pub authors: Option<String>,
    pub copyright: Option<String>,
    /// Only `<license type="expression">`; file licenses are picked up from
    /// the package directory instead.
    pub license_expression: Option<String>,
    pub project_url: Option<String>,
    /// `<repository url="…">` with any `.git` suffix removed.
    pub repository_url: Option<String>,
}

/// Parse a `.nuspec` document. Element names are matched without their
/// namespace, since the schema namespace varies between NuGet versions.
pub fn parse_nuspec(xml: &str) -> Result<Nuspec, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut meta = Nuspec::default();
    let mut stack: Vec<String> = Vec::new();
    let mut license_is_expression = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = local_name(e);
                if in_metadata(&stack) {
                    match tag.as_str() {
                        "license" => {
                            license_is_expression = attribute(e, "type").as_deref() == Some("expression");
                        }
                        "repository" => meta.repository_url = repository_url(e),
                        _ => {}
                    }
                }
                stack.push(tag);
            }
            Event::Empty(ref e) => {
                if in_metadata(&stack) && local_name(e) == "repository" {
                    meta.repository_url = repository_url(e);
                }
            }
            Event::Text(ref e) => {
                if stack.len() == 3 && stack[1] == "metadata" {
                    let text = e.unescape()?.trim().to_string();
                    let slot = match stack[2].as_str() {
                        "id" => Some(&mut meta.id),
                        "version" => Some(&mut meta.version),
                        "authors" => Some(&mut meta.authors),
                        "copyright" => Some(&mut meta.copyright),
                        "license" if license_is_expression => Some(&mut meta.license_expression),
                        "projectUrl" => Some(&mut meta.project_url),
                        _ => None,
                    };
                    if let Some(slot) = slot.filter(|_| !text.is_empty()) {
                        *slot = Some(text);
                    }
                }
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(meta)
}

fn in_metadata(stack: &[String]) -> bool {
    stack.len() == 2 && stack[1] == "metadata"
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn repository_url(e: &BytesStart) -> Option<String> {
    attribute(e, "url")
        .map(|u| u.trim().trim_end_matches('/').to_string())
        .map(|u| u.strip_suffix(".git").map(str::to_string).unwrap_or(u))
        .filter(|u| !u.is_empty())
}

/// Locate the global packages folder: explicit setting, `NUGET_PACKAGES`,
/// `~/.nuget/packages`, then whatever `dotnet nuget locals` reports.
pub fn global_packages_dir(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }

    if let Some(env) = std::env::var_os("NUGET_PACKAGES").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(env));
    }

    if let Some(home) = dirs::home_dir() {
        let default = home.join(".nuget").join("packages");
        if default.is_dir() {
            return Some(default);
        }
    }

    let output = Command::new("dotnet")
        .args(["nuget", "locals", "global-packages", "--list"])
        .output()
        .map_err(|e| log::debug!("dotnet nuget locals: {e}"))
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_locals_output(&String::from_utf8_lossy(&output.stdout))
}

/// `global-packages: /home/me/.nuget/packages/` → the path.
fn parse_locals_output(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("global-packages:"))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}
